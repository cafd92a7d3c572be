//! Silicon identity and per-variant FLL behaviour.
//!
//! Everything that differs between Madera family members is resolved once
//! here into an [`FllProfile`]; the calculator and sequencer read the profile
//! and never switch on the family themselves.

use crate::registers::{CS47L35_FLL_SYNCHRONISER_OFFS, FLL_SYNCHRONISER_OFFS};

/// Madera codec family member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipFamily {
    /// CS47L15
    Cs47l15,
    /// CS47L35
    Cs47l35,
    /// CS47L85
    Cs47l85,
    /// WM1840
    Wm1840,
    /// CS47L90
    Cs47l90,
    /// CS47L91
    Cs47l91,
    /// CS47L92
    Cs47l92,
    /// CS47L93
    Cs47l93,
}

/// Chip identity read at attach time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Chip {
    /// Family member
    pub family: ChipFamily,
    /// Silicon revision (0 = rev A0)
    pub rev: u8,
}

impl Chip {
    /// Create a chip identity
    pub const fn new(family: ChipFamily, rev: u8) -> Self {
        Self { family, rev }
    }

    /// CS47L35 rev A0, CS47L85 and WM1840 run the main loop through the
    /// sync-loop tables.
    const fn is_legacy_fll(self) -> bool {
        matches!(
            (self.family, self.rev),
            (ChipFamily::Cs47l35, 0) | (ChipFamily::Cs47l85 | ChipFamily::Wm1840, _)
        )
    }

    /// DSP clock programmed as a selector code in DSP_CLOCK_1 and the DSP's
    /// CONFIG_1 rather than as a frequency in DSP_CLOCK_2.
    pub const fn uses_legacy_dsp_clocking(self) -> bool {
        matches!(
            self.family,
            ChipFamily::Cs47l35 | ChipFamily::Cs47l85 | ChipFamily::Wm1840
        )
    }

    /// 45.1584/49.152 MHz DSPCLK selector available (CS47L85/WM1840 rev >= 3)
    pub const fn has_low_dspclk(self) -> bool {
        matches!(self.family, ChipFamily::Cs47l85 | ChipFamily::Wm1840) && self.rev >= 3
    }

    /// Resolve the FLL behaviour profile for this chip
    pub const fn fll_profile(self) -> FllProfile {
        let legacy = self.is_legacy_fll();
        let is_35 = matches!(self.family, ChipFamily::Cs47l35);
        let is_85 = matches!(self.family, ChipFamily::Cs47l85 | ChipFamily::Wm1840);

        FllProfile {
            fratio_strategy: if legacy {
                FratioStrategy::SyncTable
            } else {
                FratioStrategy::MainSearch
            },
            gain_table: if legacy {
                GainTableSelect::SyncOnly
            } else {
                GainTableSelect::PerLoop
            },
            avoid_integer_mode: legacy,
            phase_integrator: !legacy,
            alt_gain_in_integer_mode: !(is_35 || is_85),
            sync_offset: if is_35 {
                CS47L35_FLL_SYNCHRONISER_OFFS
            } else {
                FLL_SYNCHRONISER_OFFS
            },
        }
    }
}

/// How the main loop picks its fratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FratioStrategy {
    /// Look the scaled reference up in the sync fratio bands
    SyncTable,
    /// Smallest ratio keeping N within 10 bits
    MainSearch,
}

/// Which gain table each loop uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GainTableSelect {
    /// Sync gains for both loops
    SyncOnly,
    /// Sync gains for the sync loop, main gains for the main loop
    PerLoop,
}

/// Per-silicon FLL behaviour, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FllProfile {
    /// Main-loop fratio strategy (sync loops always use the sync table)
    pub fratio_strategy: FratioStrategy,
    /// Gain table selection
    pub gain_table: GainTableSelect,
    /// Refine main-loop ratio/refdiv to avoid integer-mode N
    pub avoid_integer_mode: bool,
    /// Program the EFS_2 phase integrator on enable
    pub phase_integrator: bool,
    /// Use the alternate gain when running integer mode without a sync loop
    pub alt_gain_in_integer_mode: bool,
    /// Synchroniser block offset from the FLL base
    pub sync_offset: u32,
}
