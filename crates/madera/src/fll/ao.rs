//! Always-on FLL.
//!
//! The FLL-AO only runs pre-characterised input/output pairs. Each pair maps
//! to a canned register patch written verbatim, except for the reference
//! source field in CONTROL_6 which comes from the caller.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use platform::{RegisterMap, RuntimePower};

use crate::device::Madera;
use crate::error::Error;
use crate::registers::{
    FLLAO_CONTROL_10_OFFS, FLLAO_CONTROL_11_OFFS, FLLAO_CONTROL_1_OFFS, FLLAO_CONTROL_2_OFFS,
    FLLAO_CONTROL_3_OFFS, FLLAO_CONTROL_4_OFFS, FLLAO_CONTROL_5_OFFS, FLLAO_CONTROL_6_OFFS,
    FLLAO_CONTROL_7_OFFS, FLLAO_CONTROL_8_OFFS, FLLAO_LOCK_STS1, FLL_AO_CTRL_UPD_MASK,
    FLL_AO_ENA, FLL_AO_HOLD, FLL_AO_REFCLK_SRC_MASK, FLL_AO_REFCLK_SRC_SHIFT,
};

use super::{is_enabled, wait_for_lock, FllPhase, FllSource};

/// Canned FLL-AO configuration for one input/output pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AoPatch {
    /// Input frequency (Hz)
    pub fin: u32,
    /// Output frequency (Hz)
    pub fout: u32,
    /// Ordered (offset from AO base, value) writes
    pub writes: &'static [(u32, u32)],
}

const PATCH_32K_49M: [(u32, u32); 10] = [
    (FLLAO_CONTROL_2_OFFS, 0x02EE),
    (FLLAO_CONTROL_3_OFFS, 0x0000),
    (FLLAO_CONTROL_4_OFFS, 0x0001),
    (FLLAO_CONTROL_5_OFFS, 0x0002),
    (FLLAO_CONTROL_6_OFFS, 0x8001),
    (FLLAO_CONTROL_7_OFFS, 0x0004),
    (FLLAO_CONTROL_8_OFFS, 0x0077),
    (FLLAO_CONTROL_10_OFFS, 0x06D8),
    (FLLAO_CONTROL_11_OFFS, 0x0085),
    (FLLAO_CONTROL_2_OFFS, 0x82EE),
];

const PATCH_32K_45M: [(u32, u32); 10] = [
    (FLLAO_CONTROL_2_OFFS, 0x02B1),
    (FLLAO_CONTROL_3_OFFS, 0x0001),
    (FLLAO_CONTROL_4_OFFS, 0x0010),
    (FLLAO_CONTROL_5_OFFS, 0x0002),
    (FLLAO_CONTROL_6_OFFS, 0x8001),
    (FLLAO_CONTROL_7_OFFS, 0x0004),
    (FLLAO_CONTROL_8_OFFS, 0x0077),
    (FLLAO_CONTROL_10_OFFS, 0x06D8),
    (FLLAO_CONTROL_11_OFFS, 0x0005),
    (FLLAO_CONTROL_2_OFFS, 0x82B1),
];

/// Supported FLL-AO configurations
pub const AO_PATCHES: [AoPatch; 2] = [
    AoPatch {
        fin: 32_768,
        fout: 49_152_000,
        writes: &PATCH_32K_49M,
    },
    AoPatch {
        fin: 32_768,
        fout: 45_158_400,
        writes: &PATCH_32K_45M,
    },
];

/// Patch for an exact (fin, fout) pair
pub fn find_patch(fin: u32, fout: u32) -> Option<&'static AoPatch> {
    AO_PATCHES.iter().find(|p| p.fin == fin && p.fout == fout)
}

/// Recorded FLL-AO inputs and output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AoState {
    /// Reference source
    pub ref_src: Option<FllSource>,
    /// Input frequency (Hz)
    pub ref_freq: u32,
    /// Output frequency (Hz); 0 means disabled
    pub fout: u32,
}

/// The always-on FLL
#[derive(Debug)]
pub struct FllAo {
    base: u32,
    state: AoState,
    phase: FllPhase,
}

impl FllAo {
    /// FLL-AO with its register block at `base`
    pub fn new(base: u32) -> Self {
        Self {
            base,
            state: AoState::default(),
            phase: FllPhase::Disabled,
        }
    }

    /// Recorded inputs and output
    pub fn state(&self) -> &AoState {
        &self.state
    }

    /// Sequencing phase
    pub fn phase(&self) -> FllPhase {
        self.phase
    }

    fn reg(&self, offs: u32) -> u32 {
        self.base.wrapping_add(offs)
    }

    /// Set the reference and output.
    ///
    /// No-op when nothing changes. A nonzero `fout` must match one canned
    /// configuration exactly; `fout == 0` disables the FLL-AO.
    pub fn set_ao_refclk<R, P, M, D>(
        &mut self,
        codec: &Madera<R, P, M>,
        delay: &mut D,
        source: Option<FllSource>,
        fin: u32,
        fout: u32,
    ) -> Result<(), Error<R::Error>>
    where
        R: RegisterMap,
        P: RuntimePower,
        M: RawMutex,
        D: DelayNs,
    {
        if self.state.ref_src == source && self.state.ref_freq == fin && self.state.fout == fout {
            return Ok(());
        }

        debug!("FLL_AO refclk fin={} fout={}", fin, fout);

        let next = AoState {
            ref_src: source,
            ref_freq: fin,
            fout,
        };

        if fout == 0 {
            let prev = core::mem::replace(&mut self.state, next);
            let res = self.disable(codec, delay);
            if res.is_err() && self.phase != FllPhase::Disabled {
                self.state = prev;
            }
            return res;
        }

        let patch = find_patch(fin, fout).ok_or_else(|| {
            error!("FLL_AO no matching configuration for {} -> {}", fin, fout);
            Error::NoMatchingAoConfiguration { fin, fout }
        })?;
        let source = source.ok_or(Error::NoReferenceClock)?;

        let prev = core::mem::replace(&mut self.state, next);
        let res = self.enable(codec, delay, patch, source);
        if res.is_err() && self.phase == FllPhase::Disabled {
            self.state = prev;
        }
        res
    }

    fn enable<R, P, M, D>(
        &mut self,
        codec: &Madera<R, P, M>,
        delay: &mut D,
        patch: &AoPatch,
        source: FllSource,
    ) -> Result<(), Error<R::Error>>
    where
        R: RegisterMap,
        P: RuntimePower,
        M: RawMutex,
        D: DelayNs,
    {
        let regmap = codec.regmap();
        let control_1 = self.reg(FLLAO_CONTROL_1_OFFS);

        let already_enabled = is_enabled(regmap, control_1, FLL_AO_ENA)?;
        debug!("FLL_AO enabling, initially enabled={}", already_enabled);

        if already_enabled {
            self.phase = FllPhase::Enabling;
        } else {
            codec.power().acquire();
        }

        if let Err(e) = self.load_patch(regmap, patch, source) {
            if !already_enabled {
                codec.power().release_deferred();
            }
            return Err(e);
        }
        self.phase = FllPhase::Enabling;

        regmap.update_bits(control_1, FLL_AO_HOLD, 0)?;

        if !already_enabled {
            wait_for_lock(regmap, delay, FLLAO_LOCK_STS1, true)?;
        }

        self.phase = FllPhase::Locked;
        Ok(())
    }

    /// HOLD, write the patch with `source` substituted, then set ENA.
    #[allow(clippy::arithmetic_side_effects)] // Safety: 4-bit source field shift
    fn load_patch<R: RegisterMap>(
        &self,
        regmap: &R,
        patch: &AoPatch,
        source: FllSource,
    ) -> Result<(), Error<R::Error>> {
        let control_1 = self.reg(FLLAO_CONTROL_1_OFFS);

        // HOLD before touching any configuration register
        regmap.update_bits(control_1, FLL_AO_HOLD, FLL_AO_HOLD)?;

        for &(offs, def) in patch.writes {
            let val = if offs == FLLAO_CONTROL_6_OFFS {
                (def & !FLL_AO_REFCLK_SRC_MASK)
                    | ((source.bits() << FLL_AO_REFCLK_SRC_SHIFT) & FLL_AO_REFCLK_SRC_MASK)
            } else {
                def
            };
            regmap.write(self.reg(offs), val)?;
        }

        regmap.update_bits(control_1, FLL_AO_ENA, FLL_AO_ENA)?;
        Ok(())
    }

    fn disable<R, P, M, D>(
        &mut self,
        codec: &Madera<R, P, M>,
        delay: &mut D,
    ) -> Result<(), Error<R::Error>>
    where
        R: RegisterMap,
        P: RuntimePower,
        M: RawMutex,
        D: DelayNs,
    {
        let regmap = codec.regmap();
        let control_1 = self.reg(FLLAO_CONTROL_1_OFFS);

        debug!("FLL_AO disabling");

        regmap.update_bits(control_1, FLL_AO_HOLD, FLL_AO_HOLD)?;
        let changed = regmap.update_bits_check(control_1, FLL_AO_ENA, 0)?;

        let unlocked = wait_for_lock(regmap, delay, FLLAO_LOCK_STS1, false);
        self.phase = FllPhase::Disabled;

        // CTRL_UPD must be the last bit written on the next enable, not
        // replayed early by a cache sync after a power cycle
        let ctrl_upd_off = regmap
            .update_bits(self.reg(FLLAO_CONTROL_2_OFFS), FLL_AO_CTRL_UPD_MASK, 0)
            .map_err(Error::Register);

        if changed {
            codec.power().release_deferred();
        }

        unlocked.and(ctrl_upd_off)
    }
}
