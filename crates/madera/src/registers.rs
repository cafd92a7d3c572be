//! Madera register map: addresses, field masks and shifts.
//!
//! Only the registers the clocking core touches are listed. FLL and FLL-AO
//! registers are given as offsets from the block base passed at construction.

// ── Software reset / device ID ──────────────────────────────────────────────

/// SOFTWARE_RESET (always readable, used for sysclk spin reads)
pub const SOFTWARE_RESET: u32 = 0x0000;

// ── System clocking ─────────────────────────────────────────────────────────

/// SYSTEM_CLOCK_1
pub const SYSTEM_CLOCK_1: u32 = 0x0101;
/// SAMPLE_RATE_1
pub const SAMPLE_RATE_1: u32 = 0x0102;
/// SAMPLE_RATE_2
pub const SAMPLE_RATE_2: u32 = 0x0103;
/// SAMPLE_RATE_3
pub const SAMPLE_RATE_3: u32 = 0x0104;
/// ASYNC_CLOCK_1
pub const ASYNC_CLOCK_1: u32 = 0x0112;
/// ASYNC_SAMPLE_RATE_1
pub const ASYNC_SAMPLE_RATE_1: u32 = 0x0113;
/// ASYNC_SAMPLE_RATE_2
pub const ASYNC_SAMPLE_RATE_2: u32 = 0x0114;
/// DSP_CLOCK_1
pub const DSP_CLOCK_1: u32 = 0x0120;
/// DSP_CLOCK_2 (newer parts: DSPCLK frequency in 15.625 kHz units)
pub const DSP_CLOCK_2: u32 = 0x0122;
/// OUTPUT_SYSTEM_CLOCK
pub const OUTPUT_SYSTEM_CLOCK: u32 = 0x0149;
/// OUTPUT_ASYNC_CLOCK
pub const OUTPUT_ASYNC_CLOCK: u32 = 0x014A;

/// SYSCLK_FRAC: set for 44.1 kHz-family clock frequencies
pub const SYSCLK_FRAC: u32 = 0x8000;
/// SYSCLK_FREQ field (shared layout with ASYNC_CLK_FREQ / DSP_CLK_FREQ)
pub const SYSCLK_FREQ_MASK: u32 = 0x0700;
/// SYSCLK_FREQ shift
pub const SYSCLK_FREQ_SHIFT: u32 = 8;
/// SYSCLK_SRC field (shared layout with ASYNC_CLK_SRC / DSP_CLK_SRC)
pub const SYSCLK_SRC_MASK: u32 = 0x000F;
/// SYSCLK_SRC shift
pub const SYSCLK_SRC_SHIFT: u32 = 0;

/// SAMPLE_RATE_n field
pub const SAMPLE_RATE_MASK: u32 = 0x001F;

/// OPCLK_DIV field
pub const OPCLK_DIV_MASK: u32 = 0x00F8;
/// OPCLK_DIV shift
pub const OPCLK_DIV_SHIFT: u32 = 3;
/// OPCLK_SEL field
pub const OPCLK_SEL_MASK: u32 = 0x0007;

// ── FLL1..3 (offsets from block base) ───────────────────────────────────────

/// FLL1 block base
pub const FLL1_BASE: u32 = 0x0170;
/// FLL2 block base
pub const FLL2_BASE: u32 = 0x0190;
/// FLL3 block base
pub const FLL3_BASE: u32 = 0x01B0;

/// FLL_CONTROL_1: ENA / FREERUN
pub const FLL_CONTROL_1_OFFS: u32 = 0x1;
/// FLL_CONTROL_2: CTRL_UPD / N
pub const FLL_CONTROL_2_OFFS: u32 = 0x2;
/// FLL_CONTROL_3: THETA
pub const FLL_CONTROL_3_OFFS: u32 = 0x3;
/// FLL_CONTROL_4: LAMBDA
pub const FLL_CONTROL_4_OFFS: u32 = 0x4;
/// FLL_CONTROL_5: FRATIO
pub const FLL_CONTROL_5_OFFS: u32 = 0x5;
/// FLL_CONTROL_6: REFCLK_DIV / REFCLK_SRC
pub const FLL_CONTROL_6_OFFS: u32 = 0x6;
/// FLL_CONTROL_7: GAIN
pub const FLL_CONTROL_7_OFFS: u32 = 0x9;
/// FLL_EFS_2: phase integrator
pub const FLL_EFS_2_OFFS: u32 = 0xA;

/// Synchroniser block offset from the FLL base
pub const FLL_SYNCHRONISER_OFFS: u32 = 0x10;
/// Synchroniser block offset on CS47L35
pub const CS47L35_FLL_SYNCHRONISER_OFFS: u32 = 0xE;
/// FLL_SYNCHRONISER_1: SYNC_ENA (offset from the synchroniser base)
pub const FLL_SYNCHRONISER_1_OFFS: u32 = 0x1;
/// FLL_SYNCHRONISER_7: sync GAIN / DFSAT (offset from the synchroniser base)
pub const FLL_SYNCHRONISER_7_OFFS: u32 = 0x7;

/// FLL1_FREERUN
pub const FLL1_FREERUN: u32 = 0x0002;
/// FLL1_ENA
pub const FLL1_ENA: u32 = 0x0001;
/// FLL1_CTRL_UPD
pub const FLL1_CTRL_UPD: u32 = 0x8000;
/// FLL1_N field
pub const FLL1_N_MASK: u32 = 0x03FF;
/// FLL1_THETA field
pub const FLL1_THETA_MASK: u32 = 0xFFFF;
/// FLL1_LAMBDA field
pub const FLL1_LAMBDA_MASK: u32 = 0xFFFF;
/// FLL1_FRATIO field
pub const FLL1_FRATIO_MASK: u32 = 0x0F00;
/// FLL1_FRATIO shift
pub const FLL1_FRATIO_SHIFT: u32 = 8;
/// FLL1_REFCLK_DIV field
pub const FLL1_REFCLK_DIV_MASK: u32 = 0x00C0;
/// FLL1_REFCLK_DIV shift
pub const FLL1_REFCLK_DIV_SHIFT: u32 = 6;
/// FLL1_REFCLK_SRC field
pub const FLL1_REFCLK_SRC_MASK: u32 = 0x000F;
/// FLL1_REFCLK_SRC shift
pub const FLL1_REFCLK_SRC_SHIFT: u32 = 0;
/// FLL1_GAIN field
pub const FLL1_GAIN_MASK: u32 = 0x003C;
/// FLL1_GAIN shift
pub const FLL1_GAIN_SHIFT: u32 = 2;
/// FLL1_SYNC_ENA
pub const FLL1_SYNC_ENA: u32 = 0x0001;
/// FLL1_SYNC_DFSAT
pub const FLL1_SYNC_DFSAT: u32 = 0x0001;
/// FLL1_PHASE_ENA
pub const FLL1_PHASE_ENA_MASK: u32 = 0x0800;
/// FLL1_PHASE_ENA shift
pub const FLL1_PHASE_ENA_SHIFT: u32 = 11;
/// FLL1_PHASE_GAIN field
pub const FLL1_PHASE_GAIN_MASK: u32 = 0xF000;
/// FLL1_PHASE_GAIN shift
pub const FLL1_PHASE_GAIN_SHIFT: u32 = 12;

// ── FLL-AO (offsets from block base) ────────────────────────────────────────

/// FLL_AO block base
pub const FLLAO_BASE: u32 = 0x01D0;

/// FLLAO_CONTROL_1: ENA / HOLD
pub const FLLAO_CONTROL_1_OFFS: u32 = 0x1;
/// FLLAO_CONTROL_2: CTRL_UPD / N
pub const FLLAO_CONTROL_2_OFFS: u32 = 0x2;
/// FLLAO_CONTROL_3
pub const FLLAO_CONTROL_3_OFFS: u32 = 0x3;
/// FLLAO_CONTROL_4
pub const FLLAO_CONTROL_4_OFFS: u32 = 0x4;
/// FLLAO_CONTROL_5
pub const FLLAO_CONTROL_5_OFFS: u32 = 0x5;
/// FLLAO_CONTROL_6: REFCLK_SRC
pub const FLLAO_CONTROL_6_OFFS: u32 = 0x6;
/// FLLAO_CONTROL_7
pub const FLLAO_CONTROL_7_OFFS: u32 = 0x8;
/// FLLAO_CONTROL_8
pub const FLLAO_CONTROL_8_OFFS: u32 = 0xA;
/// FLLAO_CONTROL_9
pub const FLLAO_CONTROL_9_OFFS: u32 = 0xB;
/// FLLAO_CONTROL_10
pub const FLLAO_CONTROL_10_OFFS: u32 = 0xC;
/// FLLAO_CONTROL_11
pub const FLLAO_CONTROL_11_OFFS: u32 = 0xD;

/// FLL_AO_HOLD
pub const FLL_AO_HOLD: u32 = 0x0004;
/// FLL_AO_ENA
pub const FLL_AO_ENA: u32 = 0x0001;
/// FLL_AO_CTRL_UPD
pub const FLL_AO_CTRL_UPD_MASK: u32 = 0x8000;
/// FLL_AO_REFCLK_SRC field
pub const FLL_AO_REFCLK_SRC_MASK: u32 = 0x000F;
/// FLL_AO_REFCLK_SRC shift
pub const FLL_AO_REFCLK_SRC_SHIFT: u32 = 0;

// ── Interrupt raw status ────────────────────────────────────────────────────

/// IRQ1_RAW_STATUS_2: FLL lock flags
pub const IRQ1_RAW_STATUS_2: u32 = 0x1881;
/// FLL1_LOCK_STS1; FLLn is this shifted left by n - 1
pub const FLL1_LOCK_STS1: u32 = 0x0100;
/// FLL_AO_LOCK_STS1
pub const FLLAO_LOCK_STS1: u32 = 0x0800;

// ── Audio interfaces ────────────────────────────────────────────────────────

/// AIF1 block base
pub const AIF1_BASE: u32 = 0x0500;
/// AIF2 block base
pub const AIF2_BASE: u32 = 0x0540;
/// AIF3 block base
pub const AIF3_BASE: u32 = 0x0580;
/// AIF4 block base
pub const AIF4_BASE: u32 = 0x05A0;
/// AIFn_RATE_CTRL offset from the AIF base
pub const AIF_RATE_CTRL_OFFS: u32 = 0x3;
/// AIFn_RATE field
pub const AIF1_RATE_MASK: u32 = 0x7800;
/// AIFn_RATE shift
pub const AIF1_RATE_SHIFT: u32 = 11;

// ── DSP cores ───────────────────────────────────────────────────────────────

/// DSPn_CONFIG_1 offset from the DSP base
pub const DSP_CONFIG_1_OFFS: u32 = 0x0;
/// DSPn_CONFIG_2 offset from the DSP base
pub const DSP_CONFIG_2_OFFS: u32 = 0x2;
/// DSP_RATE field in CONFIG_1
pub const DSP_RATE_MASK: u32 = 0x7800;
/// DSP_RATE shift
pub const DSP_RATE_SHIFT: u32 = 11;
/// DSP_CLK_SEL field in CONFIG_1 (legacy parts)
pub const DSP_CLK_SEL_MASK: u32 = 0x7_0000;
/// DSP_CLK_SEL shift
pub const DSP_CLK_SEL_SHIFT: u32 = 16;

// ── Mixer routing-source selectors ──────────────────────────────────────────

/// AIF1TX1MIX_INPUT_1_SOURCE
pub const AIF1TX1MIX_INPUT_1_SOURCE: u32 = 0x0700;
/// AIF2TX1MIX_INPUT_1_SOURCE
pub const AIF2TX1MIX_INPUT_1_SOURCE: u32 = 0x0740;
/// AIF3TX1MIX_INPUT_1_SOURCE
pub const AIF3TX1MIX_INPUT_1_SOURCE: u32 = 0x0780;
/// AIF4TX1MIX_INPUT_1_SOURCE
pub const AIF4TX1MIX_INPUT_1_SOURCE: u32 = 0x07A0;
/// DSP1LMIX_INPUT_1_SOURCE
pub const DSP1LMIX_INPUT_1_SOURCE: u32 = 0x0940;
/// Stride between DSP mixer blocks
pub const DSP_MIX_STRIDE: u32 = 0x40;

/// DSP1 core base (CONFIG_1)
pub const DSP1_CONFIG_1: u32 = 0x0FFE00;
/// Stride between DSP core register blocks
pub const DSP_CORE_STRIDE: u32 = 0x10_0000;
