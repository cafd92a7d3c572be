//! Register I/O port abstraction
//!
//! Models a register cache sitting on top of a control bus (I2C/SPI). All
//! methods take `&self`: an implementation serializes bus access internally,
//! the way a bus-backed register map does on hardware, so several clock
//! domains can share one port.

/// Register map trait
pub trait RegisterMap {
    /// Bus error type
    type Error: core::fmt::Debug;

    /// Read a register.
    fn read(&self, reg: u32) -> Result<u32, Self::Error>;

    /// Write a register.
    fn write(&self, reg: u32, val: u32) -> Result<(), Self::Error>;

    /// Read-modify-write the bits in `mask`, returning whether the register
    /// value changed. Nothing is written when the masked bits already match.
    fn update_bits_check(&self, reg: u32, mask: u32, val: u32) -> Result<bool, Self::Error> {
        let old = self.read(reg)?;
        let new = (old & !mask) | (val & mask);
        if new == old {
            return Ok(false);
        }
        self.write(reg, new)?;
        Ok(true)
    }

    /// Read-modify-write the bits in `mask`.
    fn update_bits(&self, reg: u32, mask: u32, val: u32) -> Result<(), Self::Error> {
        self.update_bits_check(reg, mask, val).map(|_| ())
    }

    /// Issue a write without waiting for the bus to complete it.
    ///
    /// Defaults to [`write`](Self::write); ports that batch writes override it.
    fn write_async(&self, reg: u32, val: u32) -> Result<(), Self::Error> {
        self.write(reg, val)
    }

    /// Asynchronous flavour of [`update_bits`](Self::update_bits).
    fn update_bits_async(&self, reg: u32, mask: u32, val: u32) -> Result<(), Self::Error> {
        self.update_bits(reg, mask, val)
    }

    /// Asynchronous flavour of [`update_bits_check`](Self::update_bits_check).
    fn update_bits_check_async(
        &self,
        reg: u32,
        mask: u32,
        val: u32,
    ) -> Result<bool, Self::Error> {
        self.update_bits_check(reg, mask, val)
    }
}

impl<T: RegisterMap + ?Sized> RegisterMap for &T {
    type Error = T::Error;

    fn read(&self, reg: u32) -> Result<u32, Self::Error> {
        T::read(self, reg)
    }

    fn write(&self, reg: u32, val: u32) -> Result<(), Self::Error> {
        T::write(self, reg, val)
    }

    fn update_bits_check(&self, reg: u32, mask: u32, val: u32) -> Result<bool, Self::Error> {
        T::update_bits_check(self, reg, mask, val)
    }

    fn write_async(&self, reg: u32, val: u32) -> Result<(), Self::Error> {
        T::write_async(self, reg, val)
    }

    fn update_bits_async(&self, reg: u32, mask: u32, val: u32) -> Result<(), Self::Error> {
        T::update_bits_async(self, reg, mask, val)
    }

    fn update_bits_check_async(
        &self,
        reg: u32,
        mask: u32,
        val: u32,
    ) -> Result<bool, Self::Error> {
        T::update_bits_check_async(self, reg, mask, val)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    /// Minimal single-register port that counts bus writes.
    struct OneReg {
        value: RefCell<u32>,
        writes: RefCell<usize>,
    }

    impl RegisterMap for OneReg {
        type Error = core::convert::Infallible;

        fn read(&self, _reg: u32) -> Result<u32, Self::Error> {
            Ok(*self.value.borrow())
        }

        fn write(&self, _reg: u32, val: u32) -> Result<(), Self::Error> {
            *self.value.borrow_mut() = val;
            *self.writes.borrow_mut() += 1;
            Ok(())
        }
    }

    fn port(value: u32) -> OneReg {
        OneReg {
            value: RefCell::new(value),
            writes: RefCell::new(0),
        }
    }

    #[test]
    fn update_bits_check_reports_change() {
        let p = port(0x00F0);
        assert!(p.update_bits_check(0, 0x000F, 0x0005).unwrap());
        assert_eq!(*p.value.borrow(), 0x00F5);
    }

    #[test]
    fn update_bits_check_skips_write_when_unchanged() {
        let p = port(0x00F5);
        assert!(!p.update_bits_check(0, 0x000F, 0x0005).unwrap());
        assert_eq!(*p.writes.borrow(), 0, "no bus write when masked bits already match");
    }

    #[test]
    fn update_bits_ignores_bits_outside_mask() {
        let p = port(0);
        p.update_bits(0, 0x00FF, 0xFFFF).unwrap();
        assert_eq!(*p.value.borrow(), 0x00FF);
    }

    #[test]
    fn async_variants_forward_to_sync_by_default() {
        let p = port(0);
        p.write_async(0, 0x1234).unwrap();
        assert!(p.update_bits_check_async(0, 0xF000, 0x8000).unwrap());
        p.update_bits_async(0, 0x000F, 0).unwrap();
        assert_eq!(*p.value.borrow(), 0x9230);
    }

    #[test]
    fn reference_forwards_to_inner_port() {
        let p = port(0);
        let r = &p;
        r.write(0, 7).unwrap();
        assert_eq!(r.read(0).unwrap(), 7);
    }
}
