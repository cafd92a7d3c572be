//! Runtime power-domain abstraction
//!
//! The codec's register bus can be powered down between uses. Anything that
//! keeps an internal clock running (an enabled FLL) must hold a reference on
//! the domain; the reference count itself belongs to the implementation.

/// Reference-counted runtime power domain
pub trait RuntimePower {
    /// Take a reference, synchronously resuming the device if it was down.
    fn acquire(&self);

    /// Drop a reference; the device may autosuspend some time later.
    fn release_deferred(&self);

    /// Whether the device is currently runtime-suspended.
    fn is_suspended(&self) -> bool;
}

impl<T: RuntimePower + ?Sized> RuntimePower for &T {
    fn acquire(&self) {
        T::acquire(self);
    }

    fn release_deferred(&self) {
        T::release_deferred(self);
    }

    fn is_suspended(&self) -> bool {
        T::is_suspended(self)
    }
}

/// Power domain for devices that are never runtime-suspended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlwaysOn;

impl RuntimePower for AlwaysOn {
    fn acquire(&self) {}

    fn release_deferred(&self) {}

    fn is_suspended(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold<P: RuntimePower>(power: P) -> bool {
        power.acquire();
        let awake = !power.is_suspended();
        power.release_deferred();
        awake
    }

    #[test]
    fn always_on_never_suspends() {
        assert!(hold(AlwaysOn));
        assert!(hold(&AlwaysOn));
    }
}
