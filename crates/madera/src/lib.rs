//! Clocking core for Cirrus Logic Madera audio codecs
//!
//! Synthesises the codec's internal clocks from an external reference and
//! changes sample rates without audible glitches on live mixer routes.
//!
//! # Architecture
//!
//! ```text
//! Codec driver / control plane
//!         ↓
//! madera (this crate)
//!   ├─ fll      FLL1..3 calculator + sequencer, FLL-AO
//!   ├─ clocks   SYSCLK / ASYNCCLK / DSPCLK / OPCLK
//!   ├─ rate     glitch-free rate-change coordinator
//!   ├─ aif      audio-interface sample rates
//!   └─ dsp      DSP core clocking and rate cache
//!         ↓
//! platform (RegisterMap, RuntimePower)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let codec: Madera<_, _> = Madera::new(Chip::new(ChipFamily::Cs47l90, 0), regmap, power);
//! let mut fll1 = Fll::new(1, FLL1_BASE, codec.chip());
//! fll1.init(&codec)?;
//! fll1.set_refclk(&codec, &mut delay, Some(FllSource::MCLK2), 32_768, 98_304_000)?;
//! codec.set_sysclk(ClockId::Sysclk, ClockSource::FLL1, 98_304_000)?;
//! ```
//!
//! # Features
//!
//! - `defmt`: log through defmt, derive `defmt::Format`
//! - `tracing`: log through tracing (host builds)
//! - `std`: expose `platform` mocks to dependants

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// This must go FIRST so that all the other modules see its macros.
mod fmt;

pub mod aif;
pub mod chip;
pub mod clocks;
pub mod device;
pub mod dsp;
pub mod error;
pub mod fll;
pub mod rate;
pub mod registers;

pub use aif::{Aif, AifClock};
pub use chip::{Chip, ChipFamily, FllProfile};
pub use clocks::{ClockId, ClockSource};
pub use device::{ClockRates, Madera};
pub use dsp::{DspCore, DspRate};
pub use error::{CalcError, Error};
pub use fll::{Fll, FllAo, FllConfig, FllPhase, FllSource, FllState, LoopKind};
pub use rate::{FieldUpdate, RateOutcome, RateUpdate, SourceDomain};
