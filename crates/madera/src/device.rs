//! Device-scoped clocking state.
//!
//! One [`Madera`] exists per attached codec. It owns the register port and
//! power domain plus the two locks shared by every clock-changing path:
//!
//! - the rate-change lock, guarding the routing-source cache and the recorded
//!   SYSCLK / ASYNCCLK / DSPCLK rates
//! - the DSP-rate lock, guarding the per-core desired-rate cache
//!
//! Both are `embassy_sync` blocking mutexes, generic over the raw mutex so a
//! board can pick the flavour that suits its execution model.

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;
use platform::{RegisterMap, RuntimePower};

use crate::chip::Chip;
use crate::dsp::{DspRate, DSP_COUNT};
use crate::rate::MAX_SOURCES;

/// Recorded clock-tree rates (Hz, 0 = not configured)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockRates {
    /// SYSCLK
    pub sysclk: u32,
    /// ASYNCCLK
    pub asyncclk: u32,
    /// DSPCLK
    pub dspclk: u32,
}

/// State guarded by the rate-change lock
///
/// The lock is reentrant on a single core, so the source cache is only ever
/// borrowed with `try_borrow_mut`; the clock record is a plain `Cell` and can
/// be read from inside a rate change.
#[derive(Debug, Default)]
pub(crate) struct RateState {
    /// Pre-change routing-source values for the transaction in progress
    pub(crate) cache: RefCell<heapless::Vec<u32, MAX_SOURCES>>,
    pub(crate) clocks: Cell<ClockRates>,
}

/// Madera codec clocking core
pub struct Madera<R, P, M: RawMutex = CriticalSectionRawMutex> {
    chip: Chip,
    regmap: R,
    power: P,
    pub(crate) rate: Mutex<M, RateState>,
    pub(crate) dsp_rates: Mutex<M, RefCell<[DspRate; DSP_COUNT]>>,
}

impl<R, P, M> Madera<R, P, M>
where
    R: RegisterMap,
    P: RuntimePower,
    M: RawMutex,
{
    /// Attach to a codec
    pub fn new(chip: Chip, regmap: R, power: P) -> Self {
        Self {
            chip,
            regmap,
            power,
            rate: Mutex::new(RateState::default()),
            dsp_rates: Mutex::new(RefCell::new([DspRate::default(); DSP_COUNT])),
        }
    }

    /// Chip identity
    pub fn chip(&self) -> Chip {
        self.chip
    }

    /// Register port
    pub fn regmap(&self) -> &R {
        &self.regmap
    }

    /// Runtime power domain
    pub fn power(&self) -> &P {
        &self.power
    }

    /// Recorded SYSCLK / ASYNCCLK / DSPCLK rates
    pub fn clock_rates(&self) -> ClockRates {
        self.rate.lock(|state| state.clocks.get())
    }

    /// Detach, handing back the register port and power domain
    pub fn release(self) -> (R, P) {
        (self.regmap, self.power)
    }
}
