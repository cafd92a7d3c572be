//! Compiled-in FLL frequency band tables.
//!
//! All bands are closed intervals scanned low to high; the first match wins,
//! so a frequency on a shared boundary resolves to the lower band.

/// Reference-frequency band with a fixed fratio code and ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FratioBand {
    /// Lowest reference (Hz), inclusive
    pub min: u32,
    /// Highest reference (Hz), inclusive
    pub max: u32,
    /// FRATIO register code
    pub fratio: u8,
    /// Ratio the code selects
    pub ratio: u32,
}

/// Reference-frequency band with a loop gain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainBand {
    /// Lowest reference (Hz), inclusive
    pub min: u32,
    /// Highest reference (Hz), inclusive
    pub max: u32,
    /// GAIN register code
    pub gain: u8,
    /// Alternate gain for integer-mode operation, if characterised
    pub alt_gain: Option<u8>,
}

const fn fratio(min: u32, max: u32, fratio: u8, ratio: u32) -> FratioBand {
    FratioBand {
        min,
        max,
        fratio,
        ratio,
    }
}

const fn gain(min: u32, max: u32, gain: u8, alt_gain: Option<u8>) -> GainBand {
    GainBand {
        min,
        max,
        gain,
        alt_gain,
    }
}

/// Sync-loop fratio bands (also the main loop on legacy parts)
pub const SYNC_FRATIOS: [FratioBand; 5] = [
    fratio(0, 64_000, 4, 16),
    fratio(64_000, 128_000, 3, 8),
    fratio(128_000, 256_000, 2, 4),
    fratio(256_000, 1_000_000, 1, 2),
    fratio(1_000_000, 13_500_000, 0, 1),
];

/// Sync-loop gains (both loops on legacy parts)
pub const SYNC_GAINS: [GainBand; 3] = [
    gain(0, 256_000, 0, None),
    gain(256_000, 1_000_000, 2, None),
    gain(1_000_000, 13_500_000, 4, None),
];

/// Main-loop gains
pub const MAIN_GAINS: [GainBand; 6] = [
    gain(0, 100_000, 0, Some(2)),
    gain(100_000, 375_000, 2, Some(2)),
    gain(375_000, 768_000, 3, Some(2)),
    gain(768_001, 1_500_000, 3, Some(3)),
    gain(1_500_000, 6_000_000, 4, Some(3)),
    gain(6_000_000, 13_500_000, 5, Some(3)),
];

/// Highest scaled reference usable at each ratio (index = ratio - 1) during
/// the integer-mode avoidance search.
pub const PSEUDO_FREF_MAX: [u32; 16] = [
    13_500_000, // 1
    6_144_000,  // 2
    6_144_000,  // 3
    3_072_000,  // 4
    3_072_000,  // 5
    2_822_400,  // 6
    2_822_400,  // 7
    1_536_000,  // 8
    1_536_000,  // 9
    1_536_000,  // 10
    1_536_000,  // 11
    1_536_000,  // 12
    1_536_000,  // 13
    1_536_000,  // 14
    1_536_000,  // 15
    768_000,    // 16
];

/// First fratio band containing `fref`
pub fn find_fratio_band(fref: u32) -> Option<&'static FratioBand> {
    SYNC_FRATIOS
        .iter()
        .find(|b| b.min <= fref && fref <= b.max)
}

/// First gain band in `table` containing `fref`
pub fn find_gain_band(table: &'static [GainBand], fref: u32) -> Option<&'static GainBand> {
    table.iter().find(|b| b.min <= fref && fref <= b.max)
}

/// Pseudo reference maximum for `ratio` (1..=16)
pub fn pseudo_fref_max(ratio: u32) -> Option<u32> {
    let idx = usize::try_from(ratio.checked_sub(1)?).ok()?;
    PSEUDO_FREF_MAX.get(idx).copied()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fratio_boundary_resolves_to_lower_band() {
        assert_eq!(find_fratio_band(64_000).unwrap().ratio, 16);
        assert_eq!(find_fratio_band(64_001).unwrap().ratio, 8);
        assert_eq!(find_fratio_band(1_000_000).unwrap().fratio, 1);
    }

    #[test]
    fn fratio_table_rejects_above_max_fref() {
        assert!(find_fratio_band(13_500_001).is_none());
    }

    #[test]
    fn main_gain_boundary_resolves_to_lower_band() {
        let b = find_gain_band(&MAIN_GAINS, 100_000).unwrap();
        assert_eq!((b.gain, b.alt_gain), (0, Some(2)));
        let b = find_gain_band(&MAIN_GAINS, 768_000).unwrap();
        assert_eq!((b.gain, b.alt_gain), (3, Some(2)));
        let b = find_gain_band(&MAIN_GAINS, 768_001).unwrap();
        assert_eq!(b.alt_gain, Some(3));
    }

    #[test]
    fn sync_gains_have_no_alternate() {
        assert!(SYNC_GAINS.iter().all(|b| b.alt_gain.is_none()));
    }

    #[test]
    fn pseudo_max_covers_ratio_space() {
        assert_eq!(pseudo_fref_max(1), Some(13_500_000));
        assert_eq!(pseudo_fref_max(16), Some(768_000));
        assert_eq!(pseudo_fref_max(0), None);
        assert_eq!(pseudo_fref_max(17), None);
    }
}
