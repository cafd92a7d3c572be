//! Frequency-locked loops.
//!
//! - [`calc`] - pure N.THETA/LAMBDA parameter search
//! - [`sequencer`] - FLL1..3 enable/disable with lock polling
//! - [`ao`] - always-on FLL driven from canned register patches
//! - [`tables`] - compiled-in fratio, gain and pseudo-Fref bands

pub mod ao;
pub mod calc;
pub mod sequencer;
pub mod tables;

pub use ao::FllAo;
pub use calc::{calculate, FllConfig, LoopKind};
pub use sequencer::{Fll, FllState};

use embedded_hal::delay::DelayNs;
use platform::RegisterMap;

use crate::error::Error;
use crate::registers::IRQ1_RAW_STATUS_2;

/// Lock-status polls before giving up
pub const LOCK_POLL_ATTEMPTS: u32 = 25;
/// Sleep between lock-status polls (ms)
pub const LOCK_POLL_INTERVAL_MS: u32 = 10;
/// Settle time after asserting FREERUN on a running FLL (us)
pub const FREERUN_SETTLE_US: u32 = 32;

/// FLL reference / sync input selector (REFCLK_SRC field value)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FllSource(pub u8);

impl FllSource {
    /// MCLK1 pin
    pub const MCLK1: Self = Self(0);
    /// MCLK2 pin
    pub const MCLK2: Self = Self(1);
    /// MCLK3 pin
    pub const MCLK3: Self = Self(2);
    /// SLIMbus clock
    pub const SLIMCLK: Self = Self(3);
    /// FLL1 output
    pub const FLL1: Self = Self(4);
    /// FLL2 output
    pub const FLL2: Self = Self(5);
    /// AIF1 bit clock
    pub const AIF1BCLK: Self = Self(8);
    /// AIF2 bit clock
    pub const AIF2BCLK: Self = Self(9);
    /// AIF3 bit clock
    pub const AIF3BCLK: Self = Self(10);
    /// AIF4 bit clock
    pub const AIF4BCLK: Self = Self(11);

    /// Raw field value
    pub fn bits(self) -> u32 {
        u32::from(self.0)
    }
}

/// Observable FLL sequencing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FllPhase {
    /// Output off
    #[default]
    Disabled,
    /// Configuration written, lock not (yet) confirmed
    Enabling,
    /// Lock confirmed
    Locked,
}

/// Read the enable bit of an FLL block.
pub(crate) fn is_enabled<R: RegisterMap>(
    regmap: &R,
    control_1: u32,
    ena: u32,
) -> Result<bool, Error<R::Error>> {
    let val = regmap.read(control_1).map_err(|e| {
        error!("FLL failed to read current state of {}", control_1);
        Error::Register(e)
    })?;
    Ok(val & ena != 0)
}

/// Poll the raw lock status until it matches `requested`.
///
/// Bounded: [`LOCK_POLL_ATTEMPTS`] reads spaced [`LOCK_POLL_INTERVAL_MS`]
/// apart. Always runs to completion or timeout.
pub(crate) fn wait_for_lock<R: RegisterMap, D: DelayNs>(
    regmap: &R,
    delay: &mut D,
    lock_mask: u32,
    requested: bool,
) -> Result<(), Error<R::Error>> {
    debug!("FLL waiting for lock={}", requested);

    for _ in 0..LOCK_POLL_ATTEMPTS {
        let val = regmap.read(IRQ1_RAW_STATUS_2)?;
        if (val & lock_mask != 0) == requested {
            return Ok(());
        }
        delay.delay_ms(LOCK_POLL_INTERVAL_MS);
    }

    warn!("FLL timed out waiting for lock={}", requested);
    Err(Error::LockTimeout)
}
