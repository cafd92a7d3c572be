//! Error types for the clocking core.

use core::fmt;

/// FLL parameter calculation errors
///
/// Pure failures: nothing has been written to hardware when one of these is
/// returned. Each variant carries the reference frequency (Hz) that could not
/// be handled, after any reference division already applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalcError {
    /// Reference cannot be divided down to <= 13.5 MHz with divide-by-8
    UnscalableReference {
        /// Requested reference frequency
        fref: u32,
    },
    /// No fratio band or ratio keeps N within 10 bits
    NoFratioFound {
        /// Scaled reference frequency
        fref: u32,
    },
    /// Scaled reference falls outside every gain band
    NoGainBand {
        /// Scaled reference frequency
        fref: u32,
    },
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnscalableReference { fref } => {
                write!(f, "can't scale {fref} Hz reference to <= 13.5 MHz")
            }
            Self::NoFratioFound { fref } => write!(f, "no FRATIO for {fref} Hz reference"),
            Self::NoGainBand { fref } => write!(f, "no gain band for {fref} Hz reference"),
        }
    }
}

impl core::error::Error for CalcError {}

/// Clocking errors, generic over the register port's bus error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// FLL parameter calculation failed
    Calc(CalcError),
    /// FLL output frequency outside 90..=100 MHz
    InvalidOutputRange {
        /// Requested output frequency
        fout: u32,
    },
    /// Output frequency change requested on an FLL that is already running
    ActiveReconfigurationRejected {
        /// Output the FLL is locked to
        current: u32,
        /// Output that was requested
        requested: u32,
    },
    /// FLL-AO has no canned patch for this input/output pair
    NoMatchingAoConfiguration {
        /// Requested input frequency
        fin: u32,
        /// Requested output frequency
        fout: u32,
    },
    /// FLL enable requested with no reference source or a zero reference
    NoReferenceClock,
    /// Lock status did not reach the requested state in time
    LockTimeout,
    /// Register port failure
    Register(E),
    /// Sample rate not in the supported rate table
    UnsupportedSampleRate(u32),
    /// Clock frequency or source not representable by the clock registers
    InvalidClockSetting {
        /// Requested frequency
        freq: u32,
    },
    /// DSP core number outside 1..=7
    InvalidDsp(u8),
    /// Audio interface number outside 1..=4
    InvalidAif(u8),
    /// Routing-source domain larger than the rate-change cache
    TooManySources(usize),
    /// Rate change requested while one is already running on this context
    RateChangeInProgress,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::Register(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calc(e) => write!(f, "FLL calculation failed: {e}"),
            Self::InvalidOutputRange { fout } => write!(f, "invalid FLL output {fout} Hz"),
            Self::ActiveReconfigurationRejected { current, requested } => write!(
                f,
                "can't change output of active FLL from {current} Hz to {requested} Hz"
            ),
            Self::NoMatchingAoConfiguration { fin, fout } => {
                write!(f, "no FLL_AO configuration for {fin} Hz -> {fout} Hz")
            }
            Self::NoReferenceClock => write!(f, "no FLL reference clock"),
            Self::LockTimeout => write!(f, "timed out waiting for FLL lock"),
            Self::Register(e) => write!(f, "register access failed: {e:?}"),
            Self::UnsupportedSampleRate(rate) => write!(f, "unsupported sample rate {rate} Hz"),
            Self::InvalidClockSetting { freq } => write!(f, "invalid clock setting {freq} Hz"),
            Self::InvalidDsp(n) => write!(f, "invalid DSP core {n}"),
            Self::InvalidAif(n) => write!(f, "invalid audio interface {n}"),
            Self::TooManySources(n) => write!(f, "{n} routing sources exceed the cache"),
            Self::RateChangeInProgress => write!(f, "rate change already in progress"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}
