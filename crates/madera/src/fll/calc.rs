//! FLL parameter calculator.
//!
//! Pure mapping from (reference, output, loop kind, silicon profile) to the
//! values programmed into an FLL or its synchroniser:
//!
//! ```text
//!   Fref_scaled = Fref >> REFCLK_DIV                 (<= 13.5 MHz)
//!   Fout        = Fref_scaled * ratio * (N + THETA / LAMBDA)
//!   FRATIO      = ratio - 1 (main loop) or band code (sync loop)
//! ```
//!
//! No hardware is touched here; see [`super::sequencer`] for the writes.

use crate::chip::{FllProfile, FratioStrategy, GainTableSelect};
use crate::error::CalcError;

use super::tables::{self, GainBand, MAIN_GAINS, SYNC_GAINS};

/// Maximum reference frequency into the loop after REFCLK_DIV (Hz)
pub const MAX_FREF: u32 = 13_500_000;
/// Largest reference pre-divider
pub const MAX_REFDIV: u32 = 8;
/// Largest integer multiplier N (10-bit field)
pub const MAX_N: u32 = 1023;
/// Largest ratio the FRATIO field can select
pub const MAX_FRATIO: u32 = 16;
/// Lowest permitted FLL output (Hz)
pub const MIN_FOUT: u32 = 90_000_000;
/// Highest permitted FLL output (Hz)
pub const MAX_FOUT: u32 = 100_000_000;
/// VCO corner frequency bounding the integer-mode avoidance search (Hz)
pub const VCO_CORNER: u32 = 141_900_000;
/// VCO runs at this multiple of Fout
pub const VCO_MULT: u32 = 3;

/// Largest LAMBDA the 16-bit field holds, plus one
const LAMBDA_LIMIT: u32 = 1 << 16;

/// Which loop of the FLL is being configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopKind {
    /// Main reference loop
    Main,
    /// Synchroniser loop
    Sync,
}

/// Calculated loop configuration
///
/// Plain named fields; packing into register fields happens only when the
/// sequencer writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FllConfig {
    /// Reference divider exponent (0..=3: divide by 1/2/4/8)
    pub refdiv: u8,
    /// FRATIO register code
    pub fratio: u8,
    /// Ratio actually applied
    pub ratio: u32,
    /// Integer multiplier
    pub n: u32,
    /// Fractional numerator
    pub theta: u32,
    /// Fractional denominator, always < 65536
    pub lambda: u32,
    /// Loop gain code
    pub gain: u8,
    /// Alternate gain for integer mode, if the band has one
    pub alt_gain: Option<u8>,
    /// Integer-mode avoidance found nothing and kept the initial ratio
    pub integer_fallback: bool,
}

impl FllConfig {
    /// Reference frequency seen by the loop for a given input
    #[allow(clippy::arithmetic_side_effects)] // Safety: refdiv <= 3
    pub const fn scaled_reference(&self, fref: u32) -> u32 {
        fref >> self.refdiv
    }

    /// Gain to program on the main loop.
    ///
    /// Parts with `alt_gain_in_integer_mode` use the alternate gain when the
    /// loop runs integer mode (`theta == 0`) with no sync loop assisting.
    pub fn effective_gain(&self, have_sync: bool, profile: &FllProfile) -> u8 {
        if profile.alt_gain_in_integer_mode && !have_sync && self.theta == 0 {
            self.alt_gain.unwrap_or(self.gain)
        } else {
            self.gain
        }
    }
}

/// Check that `fref` can be divided down to <= 13.5 MHz at all.
pub fn validate_reference(fref: u32) -> Result<(), CalcError> {
    if fref / MAX_REFDIV > MAX_FREF {
        return Err(CalcError::UnscalableReference { fref });
    }
    Ok(())
}

/// Calculate the loop configuration for `fref` -> `fout`.
pub fn calculate(
    fref: u32,
    fout: u32,
    kind: LoopKind,
    profile: &FllProfile,
) -> Result<FllConfig, CalcError> {
    debug!(
        "FLL calc fref={} fout={} sync={}",
        fref,
        fout,
        kind == LoopKind::Sync
    );

    let (mut refdiv, mut scaled) = scale_reference(fref)?;

    let use_sync_table =
        kind == LoopKind::Sync || profile.fratio_strategy == FratioStrategy::SyncTable;
    let (init_ratio, band_fratio) = initial_ratio(scaled, fout, use_sync_table)?;

    let mut ratio = init_ratio;
    let mut fratio = match kind {
        LoopKind::Sync => band_fratio,
        LoopKind::Main => ratio_code(init_ratio)?,
    };
    let mut integer_fallback = false;

    if kind == LoopKind::Main && profile.avoid_integer_mode {
        if let Some((better_refdiv, better_ratio)) =
            avoid_integer_mode(fout, scaled, refdiv, init_ratio)
        {
            refdiv = better_refdiv;
            ratio = better_ratio;
            fratio = ratio_code(better_ratio)?;
            scaled = fref.checked_shr(u32::from(refdiv)).unwrap_or(0);
        } else {
            warn!("FLL falling back to integer mode operation");
            integer_fallback = true;
        }
    }

    let (n, theta, lambda) = fractional_divide(fout, ratio, scaled)?;

    let gains: &'static [GainBand] = match (kind, profile.gain_table) {
        (LoopKind::Sync, _) | (LoopKind::Main, GainTableSelect::SyncOnly) => &SYNC_GAINS,
        (LoopKind::Main, GainTableSelect::PerLoop) => &MAIN_GAINS,
    };
    let band = tables::find_gain_band(gains, scaled).ok_or_else(|| {
        error!("FLL no gain for fref={}", scaled);
        CalcError::NoGainBand { fref: scaled }
    })?;

    debug!("FLL N={} THETA={} LAMBDA={}", n, theta, lambda);
    debug!(
        "FLL FRATIO={}({}) REFCLK_DIV={} GAIN={}",
        fratio,
        ratio,
        refdiv,
        band.gain
    );

    Ok(FllConfig {
        refdiv,
        fratio,
        ratio,
        n,
        theta,
        lambda,
        gain: band.gain,
        alt_gain: band.alt_gain,
        integer_fallback,
    })
}

/// Smallest divider exponent bringing `fref` to <= 13.5 MHz.
#[allow(clippy::arithmetic_side_effects)] // Safety: halving by a constant
fn scale_reference(fref: u32) -> Result<(u8, u32), CalcError> {
    let mut div: u32 = 1;
    let mut refdiv: u8 = 0;
    let mut scaled = fref;

    while scaled > MAX_FREF {
        div = div.saturating_mul(2);
        scaled /= 2;
        refdiv = refdiv.saturating_add(1);

        if div > MAX_REFDIV {
            return Err(CalcError::UnscalableReference { fref });
        }
    }

    Ok((refdiv, scaled))
}

/// Initial ratio and (for table lookups) the band's fratio code.
fn initial_ratio(scaled: u32, fout: u32, use_sync_table: bool) -> Result<(u32, u8), CalcError> {
    if use_sync_table {
        return tables::find_fratio_band(scaled)
            .map(|b| (b.ratio, b.fratio))
            .ok_or(CalcError::NoFratioFound { fref: scaled });
    }

    // Smallest ratio for which N fits in 10 bits
    (1..=MAX_FRATIO)
        .find(|&ratio| {
            ratio
                .checked_mul(scaled)
                .and_then(|div| fout.checked_div(div))
                .is_some_and(|n| n <= MAX_N)
        })
        .map(|ratio| (ratio, 0))
        .ok_or_else(|| {
            error!("FLL unable to find FRATIO for fref={}", scaled);
            CalcError::NoFratioFound { fref: scaled }
        })
}

/// FRATIO code for a main-loop ratio.
fn ratio_code(ratio: u32) -> Result<u8, CalcError> {
    ratio
        .checked_sub(1)
        .and_then(|code| u8::try_from(code).ok())
        .ok_or(CalcError::NoFratioFound { fref: 0 })
}

/// Search ratio and divider combinations that give a fractional N.
///
/// Starts from the ratio already found (which may itself be fractional),
/// then tries higher ratios bounded by the VCO corner and the pseudo
/// reference maximum, then the next divider. Returns `(refdiv, ratio)`.
fn avoid_integer_mode(
    fout: u32,
    mut scaled: u32,
    mut refdiv: u8,
    mut init_ratio: u32,
) -> Option<(u8, u32)> {
    let mut div: u32 = 1u32.checked_shl(u32::from(refdiv))?;
    let is_fractional =
        |ratio: u32, fref: u32| ratio.checked_mul(fref).and_then(|d| fout.checked_rem(d)) != Some(0);

    while div <= MAX_REFDIV && scaled > 0 {
        if let Some(ratio) = (1..=init_ratio)
            .rev()
            .find(|&ratio| is_fractional(ratio, scaled))
        {
            return Some((refdiv, ratio));
        }

        for ratio in init_ratio.saturating_add(1)..=MAX_FRATIO {
            let vco_limit = (VCO_CORNER / 2)
                .checked_div(VCO_MULT.saturating_mul(ratio))
                .unwrap_or(0);
            if vco_limit < scaled {
                break;
            }
            if scaled > tables::pseudo_fref_max(ratio)? {
                break;
            }
            if is_fractional(ratio, scaled) {
                return Some((refdiv, ratio));
            }
        }

        div = div.saturating_mul(2);
        scaled /= 2;
        refdiv = refdiv.saturating_add(1);
        init_ratio = tables::find_fratio_band(scaled)?.ratio;
    }

    None
}

/// `fout / (ratio * fref)` as N + THETA / LAMBDA, LAMBDA reduced to 16 bits.
#[allow(clippy::arithmetic_side_effects)] // Safety: right shifts by 1 only
fn fractional_divide(fout: u32, ratio: u32, scaled: u32) -> Result<(u32, u32, u32), CalcError> {
    let no_fratio = CalcError::NoFratioFound { fref: scaled };
    let step = ratio.checked_mul(scaled).ok_or(no_fratio)?;
    let n = fout.checked_div(step).ok_or(no_fratio)?;
    if n > MAX_N {
        error!("FLL N={} exceeds 10 bits for fref={}", n, scaled);
        return Err(no_fratio);
    }

    let rem = fout.checked_rem(step).ok_or(no_fratio)?;
    if rem == 0 {
        return Ok((n, 0, 0));
    }

    let g = gcd(fout, step);
    debug!("FLL GCD={}", g);
    let mut theta = rem.checked_div(g).ok_or(no_fratio)?;
    let mut lambda = step.checked_div(g).ok_or(no_fratio)?;

    // Lossy: keeps the ratio approximately, trading precision for width
    while lambda >= LAMBDA_LIMIT {
        theta >>= 1;
        lambda >>= 1;
    }

    Ok((n, theta, lambda))
}

/// Greatest common divisor (Euclid)
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while let Some(r) = a.checked_rem(b) {
        a = b;
        b = r;
    }
    a
}
