//! FLL1..3 enable / disable sequencing.
//!
//! Transitions are driven by [`Fll::set_refclk`] and [`Fll::set_syncclk`].
//! Both loop configurations are calculated before anything is written, so a
//! calculation failure leaves hardware and the recorded state untouched.
//! Register failures part-way through a sequence are returned as-is; nothing
//! is rolled back. A sequence that fails before the enable bit moves leaves
//! the recorded state as it was, so the same request can be retried.
//!
//! Callers serialize access to one `Fll` (it takes `&mut self`).

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use platform::{RegisterMap, RuntimePower};

use crate::chip::{Chip, FllProfile};
use crate::device::Madera;
use crate::error::Error;
use crate::registers::{
    FLL1_CTRL_UPD, FLL1_ENA, FLL1_FRATIO_MASK, FLL1_FRATIO_SHIFT, FLL1_FREERUN, FLL1_GAIN_MASK,
    FLL1_GAIN_SHIFT, FLL1_LAMBDA_MASK, FLL1_LOCK_STS1, FLL1_N_MASK, FLL1_PHASE_ENA_MASK,
    FLL1_PHASE_ENA_SHIFT, FLL1_PHASE_GAIN_MASK, FLL1_PHASE_GAIN_SHIFT, FLL1_REFCLK_DIV_MASK,
    FLL1_REFCLK_DIV_SHIFT, FLL1_REFCLK_SRC_MASK, FLL1_REFCLK_SRC_SHIFT, FLL1_SYNC_DFSAT,
    FLL1_SYNC_ENA, FLL1_THETA_MASK, FLL_CONTROL_1_OFFS, FLL_CONTROL_2_OFFS, FLL_CONTROL_3_OFFS,
    FLL_CONTROL_4_OFFS, FLL_CONTROL_5_OFFS, FLL_CONTROL_6_OFFS, FLL_CONTROL_7_OFFS,
    FLL_EFS_2_OFFS, FLL_SYNCHRONISER_1_OFFS, FLL_SYNCHRONISER_7_OFFS,
};

use super::calc::{self, FllConfig, LoopKind, MAX_FOUT, MIN_FOUT};
use super::{is_enabled, wait_for_lock, FllPhase, FllSource, FREERUN_SETTLE_US};

/// Sync references above this get the wider synchroniser bandwidth (Hz)
const SYNC_DFSAT_THRESHOLD: u32 = 100_000;

/// Recorded FLL inputs and output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FllState {
    /// Main reference source
    pub ref_src: Option<FllSource>,
    /// Main reference frequency (Hz)
    pub ref_freq: u32,
    /// Synchroniser source
    pub sync_src: Option<FllSource>,
    /// Synchroniser frequency (Hz)
    pub sync_freq: u32,
    /// Output frequency (Hz); 0 means disabled
    pub fout: u32,
}

impl FllState {
    fn have_sync(&self) -> bool {
        self.sync_src.is_some() && self.sync_freq > 0
    }
}

/// Both loop configurations for one enable, computed up front
#[derive(Debug, Clone, Copy)]
struct EnablePlan {
    ref_src: FllSource,
    main: FllConfig,
    sync: Option<(FllSource, FllConfig)>,
}

/// One FLL instance (FLL1, FLL2 or FLL3)
#[derive(Debug)]
pub struct Fll {
    id: u8,
    base: u32,
    chip: Chip,
    profile: FllProfile,
    state: FllState,
    phase: FllPhase,
}

impl Fll {
    /// FLL `id` (1-based) with its register block at `base`
    pub fn new(id: u8, base: u32, chip: Chip) -> Self {
        Self {
            id,
            base,
            chip,
            profile: chip.fll_profile(),
            state: FllState::default(),
            phase: FllPhase::Disabled,
        }
    }

    /// FLL number
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Register block base
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Chip this FLL belongs to
    pub fn chip(&self) -> Chip {
        self.chip
    }

    /// Resolved silicon profile
    pub fn profile(&self) -> &FllProfile {
        &self.profile
    }

    /// Recorded inputs and output
    pub fn state(&self) -> &FllState {
        &self.state
    }

    /// Sequencing phase
    pub fn phase(&self) -> FllPhase {
        self.phase
    }

    fn sync_base(&self) -> u32 {
        self.base.wrapping_add(self.profile.sync_offset)
    }

    fn reg(&self, offs: u32) -> u32 {
        self.base.wrapping_add(offs)
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: id is 1..=3, shift < 32
    fn lock_mask(&self) -> u32 {
        FLL1_LOCK_STS1 << u32::from(self.id.saturating_sub(1))
    }

    /// Clear any FREERUN left over from before attach.
    pub fn init<R, P, M>(&mut self, codec: &Madera<R, P, M>) -> Result<(), Error<R::Error>>
    where
        R: RegisterMap,
        P: RuntimePower,
        M: RawMutex,
    {
        codec
            .regmap()
            .update_bits(self.reg(FLL_CONTROL_1_OFFS), FLL1_FREERUN, 0)?;
        Ok(())
    }

    /// Set the main reference and output.
    ///
    /// No-op when nothing changes. A nonzero `fout` must lie in 90..=100 MHz,
    /// must match the running output (if any) and `fref` must be scalable;
    /// the FLL is then (re)enabled. `fout == 0` disables it.
    pub fn set_refclk<R, P, M, D>(
        &mut self,
        codec: &Madera<R, P, M>,
        delay: &mut D,
        source: Option<FllSource>,
        fref: u32,
        fout: u32,
    ) -> Result<(), Error<R::Error>>
    where
        R: RegisterMap,
        P: RuntimePower,
        M: RawMutex,
        D: DelayNs,
    {
        if self.state.ref_src == source && self.state.ref_freq == fref && self.state.fout == fout {
            return Ok(());
        }

        let next = FllState {
            ref_src: source,
            ref_freq: fref,
            fout,
            ..self.state
        };

        if fout == 0 {
            return self.commit_disable(codec, delay, next);
        }

        if !(MIN_FOUT..=MAX_FOUT).contains(&fout) {
            error!("FLL{} invalid fout {}", self.id, fout);
            return Err(Error::InvalidOutputRange { fout });
        }
        self.validate(fref, fout)?;

        let plan = self.plan(&next)?;
        self.commit_enable(codec, delay, next, &plan)
    }

    /// Set the synchroniser reference.
    ///
    /// No-op when nothing changes. If the FLL is running and `fref` is
    /// nonzero the FLL is re-enabled to fold in the new sync loop; otherwise
    /// the new source is only recorded for the next enable.
    pub fn set_syncclk<R, P, M, D>(
        &mut self,
        codec: &Madera<R, P, M>,
        delay: &mut D,
        source: Option<FllSource>,
        fref: u32,
    ) -> Result<(), Error<R::Error>>
    where
        R: RegisterMap,
        P: RuntimePower,
        M: RawMutex,
        D: DelayNs,
    {
        if self.state.sync_src == source && self.state.sync_freq == fref {
            return Ok(());
        }

        let next = FllState {
            sync_src: source,
            sync_freq: fref,
            ..self.state
        };

        if self.state.fout == 0 || fref == 0 {
            self.state = next;
            return Ok(());
        }

        self.validate(fref, self.state.fout)?;
        let plan = self.plan(&next)?;
        self.commit_enable(codec, delay, next, &plan)
    }

    /// Record `next` and enable; restore the old record if ENA never got set.
    fn commit_enable<R, P, M, D>(
        &mut self,
        codec: &Madera<R, P, M>,
        delay: &mut D,
        next: FllState,
        plan: &EnablePlan,
    ) -> Result<(), Error<R::Error>>
    where
        R: RegisterMap,
        P: RuntimePower,
        M: RawMutex,
        D: DelayNs,
    {
        let prev = core::mem::replace(&mut self.state, next);
        let res = self.enable(codec, delay, plan);
        if res.is_err() && self.phase == FllPhase::Disabled {
            self.state = prev;
        }
        res
    }

    /// Record `next` and disable; restore the old record if ENA was never cleared.
    fn commit_disable<R, P, M, D>(
        &mut self,
        codec: &Madera<R, P, M>,
        delay: &mut D,
        next: FllState,
    ) -> Result<(), Error<R::Error>>
    where
        R: RegisterMap,
        P: RuntimePower,
        M: RawMutex,
        D: DelayNs,
    {
        let prev = core::mem::replace(&mut self.state, next);
        let res = self.disable(codec, delay);
        if res.is_err() && self.phase != FllPhase::Disabled {
            self.state = prev;
        }
        res
    }

    fn validate<E>(&self, fref: u32, fout: u32) -> Result<(), Error<E>> {
        if self.state.fout != 0 && fout != self.state.fout {
            error!("FLL{} can't change output on active FLL", self.id);
            return Err(Error::ActiveReconfigurationRejected {
                current: self.state.fout,
                requested: fout,
            });
        }

        calc::validate_reference(fref).map_err(|e| {
            error!("FLL{} can't scale {} Hz to <= 13.5 MHz", self.id, fref);
            Error::Calc(e)
        })
    }

    fn plan<E>(&self, next: &FllState) -> Result<EnablePlan, Error<E>> {
        let Some(ref_src) = next.ref_src.filter(|_| next.ref_freq != 0) else {
            error!("FLL{} no REFCLK", self.id);
            return Err(Error::NoReferenceClock);
        };

        let sync = match next.sync_src {
            Some(src) if next.have_sync() => Some((
                src,
                calc::calculate(next.sync_freq, next.fout, LoopKind::Sync, &self.profile)
                    .map_err(Error::Calc)?,
            )),
            _ => None,
        };

        let main = calc::calculate(next.ref_freq, next.fout, LoopKind::Main, &self.profile)
            .map_err(Error::Calc)?;

        Ok(EnablePlan { ref_src, main, sync })
    }

    fn enable<R, P, M, D>(
        &mut self,
        codec: &Madera<R, P, M>,
        delay: &mut D,
        plan: &EnablePlan,
    ) -> Result<(), Error<R::Error>>
    where
        R: RegisterMap,
        P: RuntimePower,
        M: RawMutex,
        D: DelayNs,
    {
        let regmap = codec.regmap();
        let control_1 = self.reg(FLL_CONTROL_1_OFFS);
        let sync_base = self.sync_base();
        let have_sync = plan.sync.is_some();

        let already_enabled = is_enabled(regmap, control_1, FLL1_ENA)?;
        debug!("FLL{} enabling, initially enabled={}", self.id, already_enabled);

        if already_enabled {
            self.phase = FllPhase::Enabling;
            // Keep the output running glitch-free across the rewrite
            regmap.update_bits_async(self.reg(FLL_CONTROL_7_OFFS), FLL1_GAIN_MASK, 0)?;
            regmap.update_bits(control_1, FLL1_FREERUN, FLL1_FREERUN)?;
            delay.delay_us(FREERUN_SETTLE_US);
        }

        let mut changed = false;

        if let Some((sync_src, sync_cfg)) = plan.sync {
            changed |= apply_loop(
                regmap,
                sync_base,
                &sync_cfg,
                sync_src,
                LoopKind::Sync,
                sync_cfg.gain,
            )?;
        }

        if self.profile.phase_integrator {
            changed |= self.set_phase_integrator(regmap, &plan.main, have_sync)?;
        }

        let gain = plan.main.effective_gain(have_sync, &self.profile);
        changed |= apply_loop(
            regmap,
            self.base,
            &plan.main,
            plan.ref_src,
            LoopKind::Main,
            gain,
        )?;

        // Wider synchroniser bandwidth unless the sync source is low frequency
        let dfsat = if have_sync && self.state.sync_freq > SYNC_DFSAT_THRESHOLD {
            0
        } else {
            FLL1_SYNC_DFSAT
        };
        regmap.update_bits_async(
            sync_base.wrapping_add(FLL_SYNCHRONISER_7_OFFS),
            FLL1_SYNC_DFSAT,
            dfsat,
        )?;

        if !already_enabled {
            codec.power().acquire();
        }

        if let Err(e) = regmap.update_bits_async(control_1, FLL1_ENA, FLL1_ENA) {
            error!("FLL{} failed to set ENA", self.id);
            if !already_enabled {
                codec.power().release_deferred();
            }
            return Err(Error::Register(e));
        }
        self.phase = FllPhase::Enabling;

        if have_sync {
            regmap.update_bits_async(
                sync_base.wrapping_add(FLL_SYNCHRONISER_1_OFFS),
                FLL1_SYNC_ENA,
                FLL1_SYNC_ENA,
            )?;
        }
        if already_enabled {
            regmap.update_bits_async(control_1, FLL1_FREERUN, 0)?;
        }

        if changed || !already_enabled {
            wait_for_lock(regmap, delay, self.lock_mask(), true)?;
        }

        self.phase = FllPhase::Locked;
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
        let control_1 = self.reg(FLL_CONTROL_1_OFFS);

        debug!("FLL{} disabling", self.id);

        regmap.update_bits_async(control_1, FLL1_FREERUN, FLL1_FREERUN)?;
        let changed = regmap.update_bits_check(control_1, FLL1_ENA, 0)?;

        // ENA is down: finish the sequence and drop the reference regardless,
        // reporting the first failure
        let sync_off = regmap
            .update_bits(
                self.sync_base().wrapping_add(FLL_SYNCHRONISER_1_OFFS),
                FLL1_SYNC_ENA,
                0,
            )
            .map_err(Error::Register);
        let freerun_off = regmap
            .update_bits_async(control_1, FLL1_FREERUN, 0)
            .map_err(Error::Register);
        let unlocked = wait_for_lock(regmap, delay, self.lock_mask(), false);
        self.phase = FllPhase::Disabled;

        if changed {
            codec.power().release_deferred();
        }

        sync_off.and(freerun_off).and(unlocked)
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: constant field packing
    fn set_phase_integrator<R: RegisterMap>(
        &self,
        regmap: &R,
        main: &FllConfig,
        have_sync: bool,
    ) -> Result<bool, Error<R::Error>> {
        let gain = 2 << FLL1_PHASE_GAIN_SHIFT;
        let val = if !have_sync && main.theta == 0 {
            (1 << FLL1_PHASE_ENA_SHIFT) | gain
        } else {
            gain
        };

        Ok(regmap.update_bits_check(
            self.reg(FLL_EFS_2_OFFS),
            FLL1_PHASE_ENA_MASK | FLL1_PHASE_GAIN_MASK,
            val,
        )?)
    }
}

/// Write one loop's configuration, returning whether any register changed.
///
/// CTRL_UPD/N goes last so the new ratio is latched as a whole.
#[allow(clippy::arithmetic_side_effects)] // Safety: u8 fields shifted into 16-bit registers
fn apply_loop<R: RegisterMap>(
    regmap: &R,
    base: u32,
    cfg: &FllConfig,
    source: FllSource,
    kind: LoopKind,
    gain: u8,
) -> Result<bool, Error<R::Error>> {
    let reg = |offs: u32| base.wrapping_add(offs);
    let mut changed = false;

    changed |= regmap.update_bits_check_async(reg(FLL_CONTROL_3_OFFS), FLL1_THETA_MASK, cfg.theta)?;
    changed |=
        regmap.update_bits_check_async(reg(FLL_CONTROL_4_OFFS), FLL1_LAMBDA_MASK, cfg.lambda)?;
    changed |= regmap.update_bits_check_async(
        reg(FLL_CONTROL_5_OFFS),
        FLL1_FRATIO_MASK,
        u32::from(cfg.fratio) << FLL1_FRATIO_SHIFT,
    )?;
    changed |= regmap.update_bits_check_async(
        reg(FLL_CONTROL_6_OFFS),
        FLL1_REFCLK_DIV_MASK | FLL1_REFCLK_SRC_MASK,
        (u32::from(cfg.refdiv) << FLL1_REFCLK_DIV_SHIFT) | (source.bits() << FLL1_REFCLK_SRC_SHIFT),
    )?;

    let gain_reg = match kind {
        LoopKind::Sync => reg(FLL_SYNCHRONISER_7_OFFS),
        LoopKind::Main => reg(FLL_CONTROL_7_OFFS),
    };
    changed |=
        regmap.update_bits_check_async(gain_reg, FLL1_GAIN_MASK, u32::from(gain) << FLL1_GAIN_SHIFT)?;

    changed |= regmap.update_bits_check_async(
        reg(FLL_CONTROL_2_OFFS),
        FLL1_CTRL_UPD | FLL1_N_MASK,
        FLL1_CTRL_UPD | cfg.n,
    )?;

    Ok(changed)
}
