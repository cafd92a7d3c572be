//! Audio-interface sample rates.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use platform::{RegisterMap, RuntimePower};

use crate::device::Madera;
use crate::error::Error;
use crate::rate::{RateOutcome, RateUpdate, SourceDomain};
use crate::registers::{
    AIF1_BASE, AIF1_RATE_MASK, AIF1_RATE_SHIFT, AIF2_BASE, AIF3_BASE, AIF4_BASE,
    AIF_RATE_CTRL_OFFS, ASYNC_SAMPLE_RATE_1, ASYNC_SAMPLE_RATE_2, SAMPLE_RATE_1, SAMPLE_RATE_2,
    SAMPLE_RATE_3, SAMPLE_RATE_MASK,
};

/// Supported sample rates, indexed by register code. Zero entries are holes.
pub const SAMPLE_RATES: [u32; 24] = [
    0, 12_000, 24_000, 48_000, 96_000, 192_000, 384_000, 768_000, 0, 11_025, 22_050, 44_100,
    88_200, 176_400, 352_800, 705_600, 4_000, 8_000, 16_000, 32_000, 64_000, 128_000, 256_000,
    512_000,
];

/// Rate-table bits for the 48 kHz family
pub const RATE_MASK_48K: u32 = 0x0F_003E;
/// Rate-table bits for the 44.1 kHz family
pub const RATE_MASK_44K1: u32 = 0x00_3E00;

/// Clock domain an AIF is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AifClock {
    /// SYSCLK, sample rate 1
    #[default]
    Sysclk1,
    /// SYSCLK, sample rate 2
    Sysclk2,
    /// SYSCLK, sample rate 3
    Sysclk3,
    /// ASYNCCLK, sample rate 1
    Async1,
    /// ASYNCCLK, sample rate 2
    Async2,
}

impl AifClock {
    /// Sample-rate register for this clock
    pub fn sample_rate_reg(self) -> u32 {
        match self {
            Self::Sysclk1 => SAMPLE_RATE_1,
            Self::Sysclk2 => SAMPLE_RATE_2,
            Self::Sysclk3 => SAMPLE_RATE_3,
            Self::Async1 => ASYNC_SAMPLE_RATE_1,
            Self::Async2 => ASYNC_SAMPLE_RATE_2,
        }
    }

    /// AIFn_RATE field value selecting this clock
    pub fn rate_ctrl(self) -> u32 {
        match self {
            Self::Sysclk1 => 0,
            Self::Sysclk2 => 1,
            Self::Sysclk3 => 2,
            Self::Async1 => 8,
            Self::Async2 => 9,
        }
    }

    /// True for the ASYNCCLK slots
    pub fn is_async(self) -> bool {
        matches!(self, Self::Async1 | Self::Async2)
    }
}

/// One audio interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Aif {
    num: u8,
    base: u32,
    channels_max: usize,
}

impl Aif {
    /// AIF `num` (1..=4) at its standard register block
    pub fn standard<E>(num: u8) -> Result<Self, Error<E>> {
        let (base, channels_max) = match num {
            1 => (AIF1_BASE, 8),
            2 => (AIF2_BASE, 8),
            3 => (AIF3_BASE, 2),
            4 => (AIF4_BASE, 2),
            _ => return Err(Error::InvalidAif(num)),
        };
        Ok(Self {
            num,
            base,
            channels_max,
        })
    }

    /// Interface number
    pub fn num(&self) -> u8 {
        self.num
    }

    /// Register block base
    pub fn base(&self) -> u32 {
        self.base
    }

    /// TX channel count
    pub fn channels_max(&self) -> usize {
        self.channels_max
    }
}

/// Register code for `rate` (Hz)
pub fn sample_rate_code(rate: u32) -> Option<u32> {
    if rate == 0 {
        return None;
    }
    (0u32..)
        .zip(SAMPLE_RATES.iter())
        .find(|&(_, &r)| r == rate)
        .map(|(code, _)| code)
}

/// Display name of a sample-rate register code
pub fn sample_rate_name(code: u32) -> &'static str {
    match code {
        0x01 => "12kHz",
        0x02 => "24kHz",
        0x03 => "48kHz",
        0x04 => "96kHz",
        0x05 => "192kHz",
        0x06 => "384kHz",
        0x09 => "11.025kHz",
        0x0A => "22.05kHz",
        0x0B => "44.1kHz",
        0x0C => "88.2kHz",
        0x0D => "176.4kHz",
        0x0E => "352.8kHz",
        0x10 => "4kHz",
        0x11 => "8kHz",
        0x12 => "16kHz",
        0x13 => "32kHz",
        _ => "Illegal",
    }
}

/// Rates a stream may use given its clock's base rate (0 = clock unset)
pub fn rate_constraint_mask(base_rate: u32) -> u32 {
    if base_rate == 0 {
        RATE_MASK_48K | RATE_MASK_44K1
    } else if base_rate % 4000 != 0 {
        RATE_MASK_44K1
    } else {
        RATE_MASK_48K
    }
}

/// Sample-rate register plus AIF rate-control write
struct AifRateUpdate {
    rate_ctrl_reg: u32,
    rate_ctrl: u32,
    sample_rate_reg: u32,
    code: u32,
}

impl<R: RegisterMap> RateUpdate<R> for AifRateUpdate {
    fn is_current(&mut self, regmap: &R) -> Result<bool, Error<R::Error>> {
        let cur = regmap.read(self.rate_ctrl_reg).map_err(|e| {
            error!("Failed to check AIF rate");
            Error::Register(e)
        })?;
        Ok(cur & AIF1_RATE_MASK == self.rate_ctrl)
    }

    fn apply(&mut self, regmap: &R) -> Result<(), Error<R::Error>> {
        regmap.update_bits(self.sample_rate_reg, SAMPLE_RATE_MASK, self.code)?;
        regmap.update_bits(self.rate_ctrl_reg, AIF1_RATE_MASK, self.rate_ctrl)?;
        Ok(())
    }
}

impl<R, P, M> Madera<R, P, M>
where
    R: RegisterMap,
    P: RuntimePower,
    M: RawMutex,
{
    /// Set the sample rate of `aif`'s clock slot to `rate` (Hz).
    ///
    /// Moving the interface to a different clock slot disconnects its TX
    /// mixer sources for the duration of the write.
    #[allow(clippy::arithmetic_side_effects)] // Safety: 4-bit rate field shift
    pub fn set_aif_rate<D: DelayNs>(
        &self,
        delay: &mut D,
        aif: &Aif,
        clock: AifClock,
        rate: u32,
    ) -> Result<RateOutcome, Error<R::Error>> {
        let Some(code) = sample_rate_code(rate) else {
            error!("AIF{} unsupported sample rate {}Hz", aif.num, rate);
            return Err(Error::UnsupportedSampleRate(rate));
        };

        let mut update = AifRateUpdate {
            rate_ctrl_reg: aif.base.wrapping_add(AIF_RATE_CTRL_OFFS),
            rate_ctrl: (clock.rate_ctrl() << AIF1_RATE_SHIFT) & AIF1_RATE_MASK,
            sample_rate_reg: clock.sample_rate_reg(),
            code,
        };
        let domain = SourceDomain::aif(aif.num, aif.channels_max)?;

        debug!("AIF{} rate {} ({})", aif.num, rate, sample_rate_name(code));

        let outcome = self.change_rate(delay, &domain, &mut update)?;
        if outcome == RateOutcome::Unchanged {
            RateUpdate::<R>::apply(&mut update, self.regmap())?;
        }
        Ok(outcome)
    }

    /// Allowed-rate mask for a stream on `clock`, from the recorded clock rates
    pub fn aif_rate_constraint(&self, clock: AifClock) -> u32 {
        let rates = self.clock_rates();
        let base = if clock.is_async() {
            rates.asyncclk
        } else {
            rates.sysclk
        };
        rate_constraint_mask(base)
    }
}
