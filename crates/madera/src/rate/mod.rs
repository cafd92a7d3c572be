//! Glitch-free rate changes.
//!
//! Changing a rate-derived register while mixer routing is live produces
//! audible artifacts. [`Madera::change_rate`] makes the change look atomic to
//! downstream paths:
//!
//! ```text
//! lock ─▶ already current? ─yes─▶ Unchanged
//!               │no
//!               ▼
//!   cache + clear sources ─▶ spin ─▶ apply ─▶ spin ─▶ restore sources
//! ```
//!
//! The whole transaction runs under the device-wide rate-change lock, so two
//! changes never interleave their windows.

pub mod sources;

pub use sources::SourceDomain;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use platform::{RegisterMap, RuntimePower};

use crate::device::Madera;
use crate::error::Error;
use crate::registers::SOFTWARE_RESET;

/// Largest routing-source domain (AIF1/AIF2: 8 channels x 4 inputs)
pub const MAX_SOURCES: usize = 32;
/// Dummy reads per SYSCLK spin
pub const SPIN_READS: usize = 4;
/// Settle time after the spin reads (us)
pub const SPIN_SETTLE_US: u32 = 300;

/// A rate-derived register write run through [`Madera::change_rate`]
///
/// Both methods run with the rate-change lock held. They may read
/// [`Madera::clock_rates`] but must not start another rate change; doing so
/// fails with [`Error::RateChangeInProgress`].
pub trait RateUpdate<R: RegisterMap> {
    /// Hardware already holds the requested setting
    fn is_current(&mut self, regmap: &R) -> Result<bool, Error<R::Error>>;

    /// Perform the write(s)
    fn apply(&mut self, regmap: &R) -> Result<(), Error<R::Error>>;
}

/// Single register field update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldUpdate {
    /// Register address
    pub reg: u32,
    /// Field mask
    pub mask: u32,
    /// New field value, already shifted into place
    pub value: u32,
}

impl<R: RegisterMap> RateUpdate<R> for FieldUpdate {
    fn is_current(&mut self, regmap: &R) -> Result<bool, Error<R::Error>> {
        Ok(regmap.read(self.reg)? & self.mask == self.value & self.mask)
    }

    fn apply(&mut self, regmap: &R) -> Result<(), Error<R::Error>> {
        Ok(regmap.update_bits(self.reg, self.mask, self.value)?)
    }
}

/// What [`Madera::change_rate`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RateOutcome {
    /// Setting already current; nothing written
    Unchanged,
    /// Sources cycled around the write
    Applied,
}

impl<R, P, M> Madera<R, P, M>
where
    R: RegisterMap,
    P: RuntimePower,
    M: RawMutex,
{
    /// Apply `update` with the sources in `domain` disconnected.
    ///
    /// A failure while caching or clearing sources aborts the transaction
    /// with those sources left cleared. A restore failure stops the restore
    /// at the failing register. An apply error is returned in preference to
    /// a restore error; either way the restore is attempted.
    pub fn change_rate<D, U>(
        &self,
        delay: &mut D,
        domain: &SourceDomain<'_>,
        update: &mut U,
    ) -> Result<RateOutcome, Error<R::Error>>
    where
        D: DelayNs,
        U: RateUpdate<R>,
    {
        self.rate.lock(|state| {
            let Ok(mut cache) = state.cache.try_borrow_mut() else {
                error!("Rate change started from inside another");
                return Err(Error::RateChangeInProgress);
            };
            let regmap = self.regmap();

            if update.is_current(regmap)? {
                return Ok(RateOutcome::Unchanged);
            }

            cache.clear();
            for &reg in domain.regs() {
                let val = regmap.read(reg).map_err(|e| {
                    error!("Failed to cache source register {}", reg);
                    Error::Register(e)
                })?;
                cache
                    .push(val)
                    .map_err(|_| Error::TooManySources(domain.len()))?;

                regmap.write(reg, 0).map_err(|e| {
                    error!("Failed to clear source register {}", reg);
                    Error::Register(e)
                })?;
            }

            self.spin_sysclk(delay);
            let applied = update.apply(regmap);
            self.spin_sysclk(delay);

            let mut restored = Ok(());
            for (&reg, &val) in domain.regs().iter().zip(cache.iter()) {
                trace!("Restoring source {} = {}", reg, val);
                if let Err(e) = regmap.write(reg, val) {
                    error!("Failed to restore source register {}", reg);
                    restored = Err(Error::Register(e));
                    break;
                }
            }
            cache.clear();

            applied?;
            restored?;
            Ok(RateOutcome::Applied)
        })
    }

    /// Write `value` into `reg` under `mask` through [`change_rate`](Self::change_rate)
    pub fn set_rate_field<D: DelayNs>(
        &self,
        delay: &mut D,
        domain: &SourceDomain<'_>,
        reg: u32,
        mask: u32,
        value: u32,
    ) -> Result<RateOutcome, Error<R::Error>> {
        self.change_rate(delay, domain, &mut FieldUpdate { reg, mask, value })
    }

    /// Clock SYSCLK through a few edges so async domains see the change.
    ///
    /// Skipped while the codec is runtime-suspended. Read failures are
    /// logged and otherwise ignored.
    pub fn spin_sysclk<D: DelayNs>(&self, delay: &mut D) {
        if self.power().is_suspended() {
            return;
        }

        for i in 0..SPIN_READS {
            if self.regmap().read(SOFTWARE_RESET).is_err() {
                error!("Failed to read sysclk spin {}", i);
            }
        }

        delay.delay_us(SPIN_SETTLE_US);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::chip::{Chip, ChipFamily};
    use crate::clocks::{ClockId, ClockSource};
    use crate::device::ClockRates;
    use platform::mocks::{Access, MockBusError, MockPower, MockRegmap, RecordingDelay};

    type Codec = Madera<MockRegmap, MockPower>;

    const RATE_REG: u32 = 0x0103;
    const SOURCES: [u32; 3] = [0x0700, 0x0702, 0x0704];

    fn codec() -> Codec {
        Madera::new(
            Chip::new(ChipFamily::Cs47l92, 0),
            MockRegmap::new(),
            MockPower::new(),
        )
    }

    fn domain() -> SourceDomain<'static> {
        SourceDomain::new::<MockBusError>(&SOURCES).unwrap()
    }

    #[test]
    fn fast_path_touches_nothing() {
        let codec = codec();
        codec.regmap().set(RATE_REG, 0x3);
        let mut delay = RecordingDelay::new();

        let out = codec.set_rate_field(&mut delay, &domain(), RATE_REG, 0x1F, 0x3);
        assert_eq!(out, Ok(RateOutcome::Unchanged));
        assert_eq!(codec.regmap().log(), vec![Access::Read(RATE_REG)]);
        assert!(delay.waits_ns().is_empty());
    }

    #[test]
    fn sources_cleared_and_restored_around_apply() {
        let codec = codec();
        let map = codec.regmap();
        map.set(0x0700, 0x10);
        map.set(0x0702, 0x20);
        map.set(0x0704, 0x30);
        let mut delay = RecordingDelay::new();

        let out = codec.set_rate_field(&mut delay, &domain(), RATE_REG, 0x1F, 0x3);
        assert_eq!(out, Ok(RateOutcome::Applied));

        assert_eq!(
            map.writes(),
            vec![
                (0x0700, 0),
                (0x0702, 0),
                (0x0704, 0),
                (RATE_REG, 0x3),
                (0x0700, 0x10),
                (0x0702, 0x20),
                (0x0704, 0x30),
            ]
        );
        assert_eq!(delay.waits_us(), vec![300, 300]);
    }

    #[test]
    fn spin_skipped_while_suspended() {
        let codec = codec();
        codec.power().set_suspended(true);
        let mut delay = RecordingDelay::new();

        codec.spin_sysclk(&mut delay);
        assert!(codec.regmap().log().is_empty());
        assert!(delay.waits_ns().is_empty());
    }

    #[test]
    fn spin_read_errors_are_swallowed() {
        let codec = codec();
        codec.regmap().fail_read(SOFTWARE_RESET);
        let mut delay = RecordingDelay::new();

        codec.spin_sysclk(&mut delay);
        assert_eq!(codec.regmap().log().len(), SPIN_READS);
        assert_eq!(delay.waits_us(), vec![300]);
    }

    #[test]
    fn apply_error_still_restores() {
        let codec = codec();
        let map = codec.regmap();
        map.set(0x0702, 0x22);
        map.fail_write(RATE_REG);
        let mut delay = RecordingDelay::new();

        let out = codec.set_rate_field(&mut delay, &domain(), RATE_REG, 0x1F, 0x3);
        assert_eq!(out, Err(Error::Register(MockBusError { reg: RATE_REG })));
        assert_eq!(map.get(0x0702), 0x22);
    }

    /// Starts a nested rate change from inside `apply`
    struct Nested<'a> {
        codec: &'a Codec,
        seen: Option<ClockRates>,
        inner: Option<Result<RateOutcome, Error<MockBusError>>>,
    }

    impl RateUpdate<MockRegmap> for Nested<'_> {
        fn is_current(&mut self, _: &MockRegmap) -> Result<bool, Error<MockBusError>> {
            Ok(false)
        }

        fn apply(&mut self, _: &MockRegmap) -> Result<(), Error<MockBusError>> {
            self.seen = Some(self.codec.clock_rates());
            let mut delay = RecordingDelay::new();
            self.inner = Some(self.codec.set_rate_field(
                &mut delay,
                &SourceDomain::empty(),
                RATE_REG,
                0x1F,
                0x3,
            ));
            Ok(())
        }
    }

    #[test]
    fn nested_change_is_refused_not_deadlocked() {
        let codec = codec();
        codec
            .set_sysclk(ClockId::Sysclk, ClockSource::FLL1, 98_304_000)
            .unwrap();
        let mut nested = Nested {
            codec: &codec,
            seen: None,
            inner: None,
        };
        let mut delay = RecordingDelay::new();

        let out = codec.change_rate(&mut delay, &domain(), &mut nested);
        assert_eq!(out, Ok(RateOutcome::Applied));
        assert_eq!(nested.seen.map(|r| r.sysclk), Some(98_304_000));
        assert_eq!(nested.inner, Some(Err(Error::RateChangeInProgress)));
        assert!(codec.regmap().writes_to(RATE_REG).is_empty());

        // The outer transaction released the cache
        let again = codec.set_rate_field(&mut delay, &domain(), RATE_REG, 0x1F, 0x3);
        assert_eq!(again, Ok(RateOutcome::Applied));
    }
}
