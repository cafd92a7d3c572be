//! Routing-source selector registers per clock domain.
//!
//! A rate change on an AIF or DSP has to disconnect every mixer input that
//! feeds it. AIF TX mixers have four inputs per channel, each input occupying
//! a source/volume register pair. DSP mixers have four inputs on each side
//! followed by six AUX inputs.

use crate::error::Error;
use crate::registers::{
    AIF1TX1MIX_INPUT_1_SOURCE, AIF2TX1MIX_INPUT_1_SOURCE, AIF3TX1MIX_INPUT_1_SOURCE,
    AIF4TX1MIX_INPUT_1_SOURCE, DSP1LMIX_INPUT_1_SOURCE, DSP_MIX_STRIDE,
};

use super::MAX_SOURCES;

/// Mixer inputs per AIF TX channel
pub const INPUTS_PER_CHANNEL: usize = 4;
/// Source registers of a DSP mixer block
pub const DSP_SOURCE_COUNT: usize = 14;
/// Number of DSP cores with mixer blocks
pub const DSP_MIXERS: u8 = 7;

/// Input offsets within a DSP mixer block: L1..4, R1..4, AUX1..6
const DSP_SOURCE_OFFSETS: [u32; DSP_SOURCE_COUNT] = [
    0x00, 0x02, 0x04, 0x06, 0x08, 0x0A, 0x0C, 0x0E, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38,
];

#[allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::indexing_slicing
)]
const fn aif_sources<const N: usize>(base: u32) -> [u32; N] {
    let mut regs = [0; N];
    let mut i = 0;
    while i < N {
        let channel = (i / INPUTS_PER_CHANNEL) as u32;
        let input = (i % INPUTS_PER_CHANNEL) as u32;
        regs[i] = base + channel * 8 + input * 2;
        i += 1;
    }
    regs
}

#[allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]
const fn dsp_sources(n: u32) -> [u32; DSP_SOURCE_COUNT] {
    let base = DSP1LMIX_INPUT_1_SOURCE + (n - 1) * DSP_MIX_STRIDE;
    let mut regs = [0; DSP_SOURCE_COUNT];
    let mut i = 0;
    while i < DSP_SOURCE_COUNT {
        regs[i] = base + DSP_SOURCE_OFFSETS[i];
        i += 1;
    }
    regs
}

static AIF1_SOURCES: [u32; 32] = aif_sources(AIF1TX1MIX_INPUT_1_SOURCE);
static AIF2_SOURCES: [u32; 32] = aif_sources(AIF2TX1MIX_INPUT_1_SOURCE);
static AIF3_SOURCES: [u32; 8] = aif_sources(AIF3TX1MIX_INPUT_1_SOURCE);
static AIF4_SOURCES: [u32; 8] = aif_sources(AIF4TX1MIX_INPUT_1_SOURCE);

static DSP_SOURCES: [[u32; DSP_SOURCE_COUNT]; DSP_MIXERS as usize] = [
    dsp_sources(1),
    dsp_sources(2),
    dsp_sources(3),
    dsp_sources(4),
    dsp_sources(5),
    dsp_sources(6),
    dsp_sources(7),
];

/// Source selector registers feeding one clock domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceDomain<'a> {
    regs: &'a [u32],
}

impl<'a> SourceDomain<'a> {
    /// Domain over an arbitrary register list (at most [`MAX_SOURCES`])
    pub fn new<E>(regs: &'a [u32]) -> Result<Self, Error<E>> {
        if regs.len() > MAX_SOURCES {
            return Err(Error::TooManySources(regs.len()));
        }
        Ok(Self { regs })
    }

    /// Domain with no sources; a rate change still spins SYSCLK around the write
    pub const fn empty() -> Self {
        Self { regs: &[] }
    }

    /// Source registers, in cache/restore order
    pub fn regs(&self) -> &'a [u32] {
        self.regs
    }

    /// Number of source registers
    pub fn len(&self) -> usize {
        self.regs.len()
    }

    /// True when the domain has no sources
    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }
}

impl SourceDomain<'static> {
    /// TX mixer sources of AIF `n` (1..=4), limited to its first
    /// `channels_max` channels.
    pub fn aif<E>(n: u8, channels_max: usize) -> Result<Self, Error<E>> {
        let all: &'static [u32] = match n {
            1 => &AIF1_SOURCES,
            2 => &AIF2_SOURCES,
            3 => &AIF3_SOURCES,
            4 => &AIF4_SOURCES,
            _ => return Err(Error::InvalidAif(n)),
        };
        let len = channels_max.saturating_mul(INPUTS_PER_CHANNEL).min(all.len());
        let regs = all.get(..len).unwrap_or(all);
        Ok(Self { regs })
    }

    /// Mixer sources of DSP `n` (1..=7)
    pub fn dsp<E>(n: u8) -> Result<Self, Error<E>> {
        let regs = usize::from(n)
            .checked_sub(1)
            .and_then(|i| DSP_SOURCES.get(i))
            .ok_or(Error::InvalidDsp(n))?;
        Ok(Self { regs })
    }
}
