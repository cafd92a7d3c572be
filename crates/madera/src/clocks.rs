//! System clock tree: SYSCLK, ASYNCCLK, DSPCLK and the OPCLK outputs.

use embassy_sync::blocking_mutex::raw::RawMutex;
use platform::{RegisterMap, RuntimePower};

use crate::chip::Chip;
use crate::device::Madera;
use crate::error::Error;
use crate::registers::{
    ASYNC_CLOCK_1, DSP_CLOCK_1, DSP_CLOCK_2, OPCLK_DIV_MASK, OPCLK_DIV_SHIFT, OPCLK_SEL_MASK,
    OUTPUT_ASYNC_CLOCK, OUTPUT_SYSTEM_CLOCK, SYSCLK_FRAC, SYSCLK_FREQ_MASK, SYSCLK_FREQ_SHIFT,
    SYSCLK_SRC_MASK, SYSCLK_SRC_SHIFT, SYSTEM_CLOCK_1,
};

/// Clock-tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockId {
    /// Main system clock
    Sysclk,
    /// Asynchronous clock
    Asyncclk,
    /// DSP core clock
    Dspclk,
    /// OPCLK output, derived from SYSCLK
    Opclk,
    /// Async OPCLK output, derived from ASYNCCLK
    AsyncOpclk,
}

/// SYSCLK / ASYNCCLK / DSPCLK source selector (SRC field value)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSource(pub u8);

impl ClockSource {
    /// MCLK1 pin
    pub const MCLK1: Self = Self(0);
    /// MCLK2 pin
    pub const MCLK2: Self = Self(1);
    /// MCLK3 pin
    pub const MCLK3: Self = Self(2);
    /// FLL1 output
    pub const FLL1: Self = Self(4);
    /// FLL2 output
    pub const FLL2: Self = Self(5);
    /// FLL3 output
    pub const FLL3: Self = Self(6);
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

/// Highest DSPCLK on parts with exact frequency control (Hz)
pub const MAX_DSPCLK: u32 = 150_000_000;
/// DSP_CLOCK_2 unit (Hz)
const DSPCLK_STEP: u32 = 15_625;
/// Clocks not a multiple of this are 44.1 kHz family
const FRAC_BASE: u32 = 6_144_000;
/// Largest OPCLK divider
const MAX_OPCLK_DIV: u32 = 30;

/// OPCLK reference rates, 48 kHz family
const OPCLK_REF_48K: [u32; 4] = [6_144_000, 12_288_000, 24_576_000, 49_152_000];
/// OPCLK reference rates, 44.1 kHz family
const OPCLK_REF_44K1: [u32; 4] = [5_644_800, 11_289_600, 22_579_200, 45_158_400];

/// SYSCLK / ASYNCCLK frequency selector
pub fn sysclk_setting(freq: u32) -> Option<u32> {
    let sel = match freq {
        0 | 5_644_800 | 6_144_000 => 0,
        11_289_600 | 12_288_000 => 1,
        22_579_200 | 24_576_000 => 2,
        45_158_400 | 49_152_000 => 3,
        90_316_800 | 98_304_000 => 4,
        _ => return None,
    };
    Some(sel)
}

/// DSPCLK frequency selector on parts without exact frequency control
pub fn legacy_dspclk_setting(chip: Chip, freq: u32) -> Option<u32> {
    match freq {
        0 => Some(0),
        45_158_400 | 49_152_000 if chip.has_low_dspclk() => Some(3),
        135_475_200 | 147_456_000 => Some(4),
        _ => None,
    }
}

/// DSPCLK selector and DSP_CLOCK_2 word (0 when unused)
fn dspclk_setting(chip: Chip, freq: u32) -> Option<(u32, u32)> {
    if chip.uses_legacy_dsp_clocking() {
        return legacy_dspclk_setting(chip, freq).map(|sel| (sel, 0));
    }
    if freq > MAX_DSPCLK {
        return None;
    }
    Some((0, freq / DSPCLK_STEP))
}

/// OPCLK divider and reference selector producing exactly `freq` from a
/// parent clock at `refclk`
pub fn opclk_setting(refclk: u32, freq: u32) -> Option<(u32, u32)> {
    let refs = if refclk % 4000 != 0 {
        &OPCLK_REF_44K1
    } else {
        &OPCLK_REF_48K
    };

    for (sel, &rate) in (0u32..).zip(refs.iter()) {
        if rate > refclk {
            continue;
        }
        let found = (2..=MAX_OPCLK_DIV)
            .step_by(2)
            .take_while(|&div| rate.checked_div(div).is_some_and(|out| out >= freq))
            .find(|&div| rate.checked_div(div) == Some(freq));
        if let Some(div) = found {
            return Some((div, sel));
        }
    }
    None
}

impl<R, P, M> Madera<R, P, M>
where
    R: RegisterMap,
    P: RuntimePower,
    M: RawMutex,
{
    /// Set a clock's source and frequency.
    ///
    /// The recorded rate is updated before any register is written, and a
    /// zero frequency only clears it.
    #[allow(clippy::arithmetic_side_effects)] // Safety: constant-width field shifts
    pub fn set_sysclk(
        &self,
        clock: ClockId,
        source: ClockSource,
        freq: u32,
    ) -> Result<(), Error<R::Error>> {
        let invalid = Error::InvalidClockSetting { freq };
        let mut mask = SYSCLK_FREQ_MASK | SYSCLK_SRC_MASK;
        let mut val = (source.bits() << SYSCLK_SRC_SHIFT) & SYSCLK_SRC_MASK;

        let (name, reg, sel, clock_2) = match clock {
            ClockId::Sysclk => {
                mask |= SYSCLK_FRAC;
                ("SYSCLK", SYSTEM_CLOCK_1, sysclk_setting(freq), 0)
            }
            ClockId::Asyncclk => ("ASYNCCLK", ASYNC_CLOCK_1, sysclk_setting(freq), 0),
            ClockId::Dspclk => match dspclk_setting(self.chip(), freq) {
                Some((sel, clock_2)) => ("DSPCLK", DSP_CLOCK_1, Some(sel), clock_2),
                None => ("DSPCLK", DSP_CLOCK_1, None, 0),
            },
            ClockId::Opclk | ClockId::AsyncOpclk => return self.set_opclk(clock, freq),
        };

        let Some(sel) = sel else {
            error!("Failed to get {} setting for {}Hz", name, freq);
            return Err(invalid);
        };

        self.rate.lock(|state| {
            let mut clocks = state.clocks.get();
            match clock {
                ClockId::Sysclk => clocks.sysclk = freq,
                ClockId::Asyncclk => clocks.asyncclk = freq,
                _ => clocks.dspclk = freq,
            }
            state.clocks.set(clocks);
        });

        if freq == 0 {
            debug!("{} cleared", name);
            return Ok(());
        }

        val |= (sel << SYSCLK_FREQ_SHIFT) & SYSCLK_FREQ_MASK;

        if clock_2 != 0 {
            self.regmap().write(DSP_CLOCK_2, clock_2).map_err(|e| {
                error!("Failed to write DSP_CLOCK_2");
                Error::Register(e)
            })?;
            // Frequency comes from DSP_CLOCK_2; leave the selector alone
            mask = SYSCLK_SRC_MASK;
        }

        if freq % FRAC_BASE != 0 {
            val |= SYSCLK_FRAC;
        }

        debug!("{} set to {}Hz", name, freq);
        Ok(self.regmap().update_bits(reg, mask, val & mask)?)
    }

    /// Configure an OPCLK output for exactly `freq` from its parent clock
    #[allow(clippy::arithmetic_side_effects)] // Safety: divider <= 30 fits the 5-bit field
    pub fn set_opclk(&self, clock: ClockId, freq: u32) -> Result<(), Error<R::Error>> {
        let rates = self.clock_rates();
        let (reg, refclk) = match clock {
            ClockId::Opclk => (OUTPUT_SYSTEM_CLOCK, rates.sysclk),
            ClockId::AsyncOpclk => (OUTPUT_ASYNC_CLOCK, rates.asyncclk),
            _ => return Err(Error::InvalidClockSetting { freq }),
        };

        let Some((div, sel)) = opclk_setting(refclk, freq) else {
            error!("Unable to generate {}Hz OPCLK", freq);
            return Err(Error::InvalidClockSetting { freq });
        };

        debug!("Configured {}Hz OPCLK", freq);
        Ok(self.regmap().update_bits(
            reg,
            OPCLK_DIV_MASK | OPCLK_SEL_MASK,
            ((div << OPCLK_DIV_SHIFT) & OPCLK_DIV_MASK) | (sel & OPCLK_SEL_MASK),
        )?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::chip::ChipFamily;
    use platform::mocks::{MockPower, MockRegmap};

    type Codec = Madera<MockRegmap, MockPower>;

    fn codec(family: ChipFamily, rev: u8) -> Codec {
        Madera::new(Chip::new(family, rev), MockRegmap::new(), MockPower::new())
    }

    #[test]
    fn sysclk_selectors() {
        assert_eq!(sysclk_setting(6_144_000), Some(0));
        assert_eq!(sysclk_setting(12_288_000), Some(1));
        assert_eq!(sysclk_setting(45_158_400), Some(3));
        assert_eq!(sysclk_setting(98_304_000), Some(4));
        assert_eq!(sysclk_setting(48_000_000), None);
    }

    #[test]
    fn legacy_low_dspclk_needs_rev_3() {
        let old = Chip::new(ChipFamily::Cs47l85, 2);
        let new = Chip::new(ChipFamily::Cs47l85, 3);
        assert_eq!(legacy_dspclk_setting(old, 49_152_000), None);
        assert_eq!(legacy_dspclk_setting(new, 49_152_000), Some(3));
        assert_eq!(legacy_dspclk_setting(old, 147_456_000), Some(4));
        assert_eq!(
            legacy_dspclk_setting(Chip::new(ChipFamily::Cs47l35, 5), 45_158_400),
            None
        );
    }

    #[test]
    fn sysclk_write_includes_frac_for_44k1() {
        let codec = codec(ChipFamily::Cs47l90, 0);
        codec
            .set_sysclk(ClockId::Sysclk, ClockSource::FLL1, 90_316_800)
            .unwrap();
        assert_eq!(codec.regmap().get(SYSTEM_CLOCK_1), 0x8000 | (4 << 8) | 4);
        assert_eq!(codec.clock_rates().sysclk, 90_316_800);
    }

    #[test]
    fn asyncclk_never_touches_frac() {
        let codec = codec(ChipFamily::Cs47l90, 0);
        codec.regmap().set(ASYNC_CLOCK_1, 0x8000);
        codec
            .set_sysclk(ClockId::Asyncclk, ClockSource::FLL2, 45_158_400)
            .unwrap();
        assert_eq!(codec.regmap().get(ASYNC_CLOCK_1), 0x8000 | (3 << 8) | 5);
    }

    #[test]
    fn zero_frequency_only_clears_record() {
        let codec = codec(ChipFamily::Cs47l90, 0);
        codec
            .set_sysclk(ClockId::Sysclk, ClockSource::FLL1, 98_304_000)
            .unwrap();
        codec.regmap().clear_log();
        codec.set_sysclk(ClockId::Sysclk, ClockSource::FLL1, 0).unwrap();
        assert!(codec.regmap().writes().is_empty());
        assert_eq!(codec.clock_rates().sysclk, 0);
    }

    #[test]
    fn unsupported_frequency_rejected_without_recording() {
        let codec = codec(ChipFamily::Cs47l90, 0);
        assert_eq!(
            codec.set_sysclk(ClockId::Sysclk, ClockSource::FLL1, 50_000_000),
            Err(Error::InvalidClockSetting { freq: 50_000_000 })
        );
        assert_eq!(codec.clock_rates().sysclk, 0);
        assert!(codec.regmap().log().is_empty());
    }

    #[test]
    fn exact_dspclk_uses_clock_2() {
        let codec = codec(ChipFamily::Cs47l90, 0);
        codec.regmap().set(DSP_CLOCK_1, 0x0400);
        codec
            .set_sysclk(ClockId::Dspclk, ClockSource::FLL1, 147_456_000)
            .unwrap();
        assert_eq!(codec.regmap().get(DSP_CLOCK_2), 9437);
        assert_eq!(codec.regmap().get(DSP_CLOCK_1), 0x0400 | 4, "selector untouched");
        assert_eq!(
            codec.set_sysclk(ClockId::Dspclk, ClockSource::FLL1, 160_000_000),
            Err(Error::InvalidClockSetting { freq: 160_000_000 })
        );
    }

    #[test]
    fn legacy_dspclk_uses_selector() {
        let codec = codec(ChipFamily::Wm1840, 3);
        codec
            .set_sysclk(ClockId::Dspclk, ClockSource::FLL2, 147_456_000)
            .unwrap();
        assert_eq!(codec.regmap().get(DSP_CLOCK_1), (4 << 8) | 5);
        assert!(codec.regmap().writes_to(DSP_CLOCK_2).is_empty());
    }

    #[test]
    fn opclk_divider_search() {
        assert_eq!(opclk_setting(98_304_000, 6_144_000), Some((2, 1)));
        assert_eq!(opclk_setting(98_304_000, 3_072_000), Some((2, 0)));
        assert_eq!(opclk_setting(90_316_800, 11_289_600), Some((2, 2)));
        assert_eq!(opclk_setting(12_288_000, 24_576_000), None);
        assert_eq!(opclk_setting(98_304_000, 5_000_000), None);
    }

    #[test]
    fn opclk_uses_recorded_parent() {
        let codec = codec(ChipFamily::Cs47l90, 0);
        codec
            .set_sysclk(ClockId::Sysclk, ClockSource::FLL1, 98_304_000)
            .unwrap();
        codec
            .set_sysclk(ClockId::Opclk, ClockSource::FLL1, 12_288_000)
            .unwrap();
        assert_eq!(codec.regmap().get(OUTPUT_SYSTEM_CLOCK), (2 << 3) | 2);

        assert_eq!(
            codec.set_opclk(ClockId::AsyncOpclk, 6_144_000),
            Err(Error::InvalidClockSetting { freq: 6_144_000 }),
            "ASYNCCLK not configured"
        );
    }
}
