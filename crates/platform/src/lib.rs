//! Hardware Abstraction Layer for codec clocking drivers
//!
//! This crate provides trait-based abstractions for the hardware services a
//! codec clocking core consumes, so the core can be developed and tested
//! without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Clocking core (madera crate: FLL, FLL-AO, rate-change coordinator)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Bus layer (I2C/SPI register cache, runtime PM)
//! ```
//!
//! # Abstractions
//!
//! - [`RegisterMap`] - read / write / update-bits on device registers
//! - [`RuntimePower`] - reference-counted runtime power domain
//! - [`mocks`] - host-side test doubles (`std` feature or `cfg(test)`)
//!
//! # Features
//!
//! - `std`: Enable the host mocks for dependants' tests
//! - `defmt`: Enable defmt derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod mocks;
pub mod power;
pub mod regmap;

pub use power::RuntimePower;
pub use regmap::RegisterMap;
