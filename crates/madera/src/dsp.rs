//! DSP core clocking.
//!
//! Each DSP core runs from SYSCLK or ASYNCCLK at one of the sample-rate
//! slots. The desired slot is held in a per-device cache (written by the
//! control surface, read on clock changes) guarded by its own lock,
//! independent of the rate-change lock.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use platform::{RegisterMap, RuntimePower};

use crate::device::Madera;
use crate::error::Error;
use crate::rate::{RateOutcome, RateUpdate, SourceDomain};
use crate::registers::{
    DSP1_CONFIG_1, DSP_CLK_SEL_MASK, DSP_CLK_SEL_SHIFT, DSP_CONFIG_1_OFFS, DSP_CONFIG_2_OFFS,
    DSP_CORE_STRIDE, DSP_RATE_MASK, DSP_RATE_SHIFT,
};

/// DSP cores with a rate cache entry
pub const DSP_COUNT: usize = 7;

/// Sample-rate slot a DSP core is clocked at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DspRate {
    /// SYSCLK, sample rate 1
    #[default]
    Sync1,
    /// SYSCLK, sample rate 2
    Sync2,
    /// SYSCLK, sample rate 3
    Sync3,
    /// ASYNCCLK, sample rate 1
    Async1,
    /// ASYNCCLK, sample rate 2
    Async2,
}

impl DspRate {
    /// DSP_RATE field value
    pub fn bits(self) -> u32 {
        match self {
            Self::Sync1 => 0,
            Self::Sync2 => 1,
            Self::Sync3 => 2,
            Self::Async1 => 8,
            Self::Async2 => 9,
        }
    }

    /// Decode a DSP_RATE field value
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::Sync1),
            1 => Some(Self::Sync2),
            2 => Some(Self::Sync3),
            8 => Some(Self::Async1),
            9 => Some(Self::Async2),
            _ => None,
        }
    }
}

/// One DSP core's register block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DspCore {
    num: u8,
    base: u32,
}

impl DspCore {
    /// DSP `num` (1-based) with CONFIG_1 at `base`
    pub fn new(num: u8, base: u32) -> Self {
        Self { num, base }
    }

    /// DSP `num` at its standard register block
    pub fn standard(num: u8) -> Self {
        let index = u32::from(num.saturating_sub(1));
        let base = DSP_CORE_STRIDE
            .saturating_mul(index)
            .saturating_add(DSP1_CONFIG_1);
        Self { num, base }
    }

    /// Core number
    pub fn num(&self) -> u8 {
        self.num
    }

    /// CONFIG_1 address
    pub fn base(&self) -> u32 {
        self.base
    }
}

/// DSP clock setting write, with the cached rate folded in
struct DspClockUpdate {
    core: DspCore,
    legacy: bool,
    rate: u32,
    clk_setting: u32,
}

impl<R: RegisterMap> RateUpdate<R> for DspClockUpdate {
    fn is_current(&mut self, regmap: &R) -> Result<bool, Error<R::Error>> {
        let cur = regmap.read(self.core.base).map_err(|e| {
            error!("Failed to read current DSP{} rate", self.core.num);
            Error::Register(e)
        })?;
        Ok(cur & DSP_RATE_MASK == self.rate)
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: 3-bit selector shift
    fn apply(&mut self, regmap: &R) -> Result<(), Error<R::Error>> {
        let mut mask = DSP_RATE_MASK;
        let mut val = self.rate;

        if self.legacy {
            mask |= DSP_CLK_SEL_MASK;
            val |= (self.clk_setting << DSP_CLK_SEL_SHIFT) & DSP_CLK_SEL_MASK;
        } else {
            debug!("Set DSP{} frequency to {}", self.core.num, self.clk_setting);
            regmap
                .write(
                    self.core.base.wrapping_add(DSP_CONFIG_2_OFFS),
                    self.clk_setting,
                )
                .map_err(|e| {
                    error!("Failed to set DSP{} clock", self.core.num);
                    Error::Register(e)
                })?;
        }

        regmap.update_bits(self.core.base.wrapping_add(DSP_CONFIG_1_OFFS), mask, val)?;
        debug!("Set DSP{} clocking to {}", self.core.num, val);
        Ok(())
    }
}

impl<R, P, M> Madera<R, P, M>
where
    R: RegisterMap,
    P: RuntimePower,
    M: RawMutex,
{
    /// Desired rate of DSP `n` (1-based)
    pub fn dsp_rate(&self, n: u8) -> Result<DspRate, Error<R::Error>> {
        let index = dsp_index(n)?;
        self.dsp_rates
            .lock(|rates| rates.borrow().get(index).copied())
            .ok_or(Error::InvalidDsp(n))
    }

    /// Record the desired rate of DSP `n`; takes effect on the next
    /// [`set_dsp_clock`](Self::set_dsp_clock)
    pub fn set_dsp_rate(&self, n: u8, rate: DspRate) -> Result<(), Error<R::Error>> {
        let index = dsp_index(n)?;
        self.dsp_rates.lock(|rates| {
            let mut rates = rates.borrow_mut();
            let slot = rates.get_mut(index).ok_or(Error::InvalidDsp(n))?;
            *slot = rate;
            Ok(())
        })
    }

    /// Program a DSP core's clock.
    ///
    /// `clk_setting` is the DSPCLK selector on legacy parts and the exact
    /// frequency word for CONFIG_2 otherwise. When the cached rate differs
    /// from the core's current rate, the write runs through the rate-change
    /// coordinator with the core's mixer sources.
    #[allow(clippy::arithmetic_side_effects)] // Safety: 4-bit rate field shift
    pub fn set_dsp_clock<D: DelayNs>(
        &self,
        delay: &mut D,
        core: &DspCore,
        clk_setting: u32,
    ) -> Result<RateOutcome, Error<R::Error>> {
        let rate = self.dsp_rate(core.num)?;
        let domain = SourceDomain::dsp(core.num)?;

        let mut update = DspClockUpdate {
            core: *core,
            legacy: self.chip().uses_legacy_dsp_clocking(),
            rate: (rate.bits() << DSP_RATE_SHIFT) & DSP_RATE_MASK,
            clk_setting,
        };

        let outcome = self.change_rate(delay, &domain, &mut update)?;
        if outcome == RateOutcome::Unchanged {
            debug!("DSP{} rate not changed", core.num);
            RateUpdate::<R>::apply(&mut update, self.regmap())?;
        }
        Ok(outcome)
    }
}

fn dsp_index<E>(n: u8) -> Result<usize, Error<E>> {
    usize::from(n)
        .checked_sub(1)
        .filter(|&i| i < DSP_COUNT)
        .ok_or(Error::InvalidDsp(n))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::chip::{Chip, ChipFamily};
    use platform::mocks::{MockPower, MockRegmap, RecordingDelay};

    type Codec = Madera<MockRegmap, MockPower>;

    fn codec(family: ChipFamily) -> Codec {
        Madera::new(Chip::new(family, 0), MockRegmap::new(), MockPower::new())
    }

    #[test]
    fn rate_cache_defaults_and_bounds() {
        let codec = codec(ChipFamily::Cs47l90);
        assert_eq!(codec.dsp_rate(1), Ok(DspRate::Sync1));
        codec.set_dsp_rate(7, DspRate::Async2).unwrap();
        assert_eq!(codec.dsp_rate(7), Ok(DspRate::Async2));
        assert_eq!(codec.dsp_rate(0), Err(Error::InvalidDsp(0)));
        assert_eq!(codec.set_dsp_rate(8, DspRate::Sync1), Err(Error::InvalidDsp(8)));
    }

    #[test]
    fn standard_core_bases() {
        assert_eq!(DspCore::standard(1).base(), 0x0F_FE00);
        assert_eq!(DspCore::standard(3).base(), 0x2F_FE00);
    }

    #[test]
    fn unchanged_rate_writes_clock_directly() {
        let codec = codec(ChipFamily::Cs47l90);
        let core = DspCore::standard(1);
        codec.regmap().set(0x0940, 0x55);
        let mut delay = RecordingDelay::new();

        let out = codec.set_dsp_clock(&mut delay, &core, 9408).unwrap();
        assert_eq!(out, RateOutcome::Unchanged);
        assert_eq!(codec.regmap().get(core.base() + 2), 9408);
        assert_eq!(codec.regmap().writes_to(0x0940), Vec::<u32>::new());
        assert!(delay.waits_ns().is_empty());
    }

    #[test]
    fn rate_change_cycles_dsp_sources() {
        let codec = codec(ChipFamily::Cs47l90);
        let core = DspCore::standard(2);
        codec.set_dsp_rate(2, DspRate::Async1).unwrap();
        codec.regmap().set(0x0980, 0x21);
        let mut delay = RecordingDelay::new();

        let out = codec.set_dsp_clock(&mut delay, &core, 9408).unwrap();
        assert_eq!(out, RateOutcome::Applied);
        assert_eq!(codec.regmap().get(core.base()) & DSP_RATE_MASK, 8 << 11);
        assert_eq!(codec.regmap().writes_to(0x0980), vec![0, 0x21]);
        assert_eq!(delay.waits_us(), vec![300, 300]);
    }

    #[test]
    fn legacy_parts_fold_selector_into_config_1() {
        let codec = codec(ChipFamily::Cs47l85);
        let core = DspCore::standard(1);
        codec.set_dsp_rate(1, DspRate::Sync2).unwrap();
        let mut delay = RecordingDelay::new();

        codec.set_dsp_clock(&mut delay, &core, 4).unwrap();
        assert_eq!(codec.regmap().get(core.base()), (1 << 11) | (4 << 16));
        assert!(codec.regmap().writes_to(core.base() + 2).is_empty());
    }
}
