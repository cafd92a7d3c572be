//! Rate-change coordinator: source caching, SYSCLK spins, failure handling
//! and serialization between concurrent callers.

#![allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]

use std::time::Duration;

use embedded_hal_mock::eh1::delay::NoopDelay;
use madera::aif::{Aif, AifClock};
use madera::clocks::{ClockId, ClockSource};
use madera::registers::{SAMPLE_RATE_2, SOFTWARE_RESET};
use madera::{Chip, ChipFamily, Error, Madera, RateOutcome, RateUpdate, SourceDomain};
use platform::mocks::{Access, MockBusError, MockPower, MockRegmap, RecordingDelay};

type Codec = Madera<MockRegmap, MockPower>;

fn codec_with(map: MockRegmap) -> Codec {
    Madera::new(Chip::new(ChipFamily::Cs47l90, 0), map, MockPower::new())
}

/// Counts applies; optionally breaks a register once applied
#[derive(Default)]
struct Probe {
    applies: usize,
    fail_after_apply: Option<u32>,
}

impl RateUpdate<MockRegmap> for Probe {
    fn is_current(&mut self, _: &MockRegmap) -> Result<bool, Error<MockBusError>> {
        Ok(false)
    }

    fn apply(&mut self, regmap: &MockRegmap) -> Result<(), Error<MockBusError>> {
        self.applies += 1;
        if let Some(reg) = self.fail_after_apply {
            regmap.fail_write(reg);
        }
        Ok(())
    }
}

const SOURCES: [u32; 3] = [0x0700, 0x0702, 0x0704];

fn preload(map: &MockRegmap) {
    map.set(0x0700, 0x11);
    map.set(0x0702, 0x22);
    map.set(0x0704, 0x33);
}

#[test]
fn empty_domain_still_spins_twice() {
    let codec = codec_with(MockRegmap::new());
    let mut probe = Probe::default();
    let mut delay = RecordingDelay::new();

    let out = codec
        .change_rate(&mut delay, &SourceDomain::empty(), &mut probe)
        .unwrap();

    assert_eq!(out, RateOutcome::Applied);
    assert_eq!(probe.applies, 1);
    assert_eq!(codec.regmap().log(), vec![Access::Read(SOFTWARE_RESET); 8]);
    assert_eq!(delay.waits_us(), vec![300, 300]);
}

#[test]
fn cache_failure_aborts_with_sources_partly_cleared() {
    let map = MockRegmap::new();
    preload(&map);
    map.fail_read(0x0702);
    let codec = codec_with(map);
    let domain = SourceDomain::new::<MockBusError>(&SOURCES).unwrap();
    let mut probe = Probe::default();
    let mut delay = NoopDelay::new();

    assert_eq!(
        codec.change_rate(&mut delay, &domain, &mut probe),
        Err(Error::Register(MockBusError { reg: 0x0702 }))
    );
    assert_eq!(probe.applies, 0);
    assert_eq!(codec.regmap().get(0x0700), 0, "left cleared");
    assert_eq!(codec.regmap().get(0x0704), 0x33, "never reached");

    // The lock was released: the next transaction goes through
    codec.regmap().clear_failures();
    assert_eq!(
        codec.change_rate(&mut delay, &domain, &mut probe),
        Ok(RateOutcome::Applied)
    );
}

#[test]
fn restore_failure_stops_at_failing_register() {
    let map = MockRegmap::new();
    preload(&map);
    let codec = codec_with(map);
    let domain = SourceDomain::new::<MockBusError>(&SOURCES).unwrap();
    let mut probe = Probe {
        fail_after_apply: Some(0x0702),
        ..Probe::default()
    };
    let mut delay = NoopDelay::new();

    assert_eq!(
        codec.change_rate(&mut delay, &domain, &mut probe),
        Err(Error::Register(MockBusError { reg: 0x0702 }))
    );
    let map = codec.regmap();
    assert_eq!(map.get(0x0700), 0x11, "restored");
    assert_eq!(map.get(0x0702), 0);
    assert_eq!(map.get(0x0704), 0, "restore stopped early");
}

#[test]
fn suspended_codec_skips_spins() {
    let codec = codec_with(MockRegmap::new());
    codec.power().set_suspended(true);
    let domain = SourceDomain::new::<MockBusError>(&SOURCES).unwrap();
    let mut delay = RecordingDelay::new();

    codec
        .set_rate_field(&mut delay, &domain, SAMPLE_RATE_2, 0x1F, 0x0B)
        .unwrap();
    assert!(delay.waits_ns().is_empty());
    assert!(!codec
        .regmap()
        .log()
        .contains(&Access::Read(SOFTWARE_RESET)));
}

#[test]
fn concurrent_changes_never_interleave() {
    const A_SOURCES: [u32; 2] = [0x0700, 0x0702];
    const B_SOURCES: [u32; 2] = [0x0940, 0x0942];
    const A_RATE: u32 = 0x0102;
    const B_RATE: u32 = 0x0103;
    const ROUNDS: u32 = 6;

    let codec = codec_with(MockRegmap::new().with_access_delay(Duration::from_micros(50)));
    let a = SourceDomain::new::<MockBusError>(&A_SOURCES).unwrap();
    let b = SourceDomain::new::<MockBusError>(&B_SOURCES).unwrap();

    std::thread::scope(|s| {
        for (domain, rate_reg) in [(a, A_RATE), (b, B_RATE)] {
            let codec = &codec;
            s.spawn(move || {
                let mut delay = NoopDelay::new();
                for i in 0..ROUNDS {
                    let out = codec
                        .set_rate_field(&mut delay, &domain, rate_reg, 0x1F, i % 2 + 1)
                        .unwrap();
                    assert_eq!(out, RateOutcome::Applied);
                }
            });
        }
    });

    let writes = codec.regmap().writes();
    assert_eq!(writes.len(), 2 * ROUNDS as usize * 5);

    // Each transaction is clear, clear, apply, restore, restore
    for window in writes.chunks(5) {
        let (sources, rate_reg) = if window[0].0 == A_SOURCES[0] {
            (A_SOURCES, A_RATE)
        } else {
            (B_SOURCES, B_RATE)
        };
        let regs: Vec<u32> = window.iter().map(|&(reg, _)| reg).collect();
        assert_eq!(
            regs,
            vec![sources[0], sources[1], rate_reg, sources[0], sources[1]],
            "interleaved window: {window:?}"
        );
    }
}

#[test]
fn aif_slot_change_after_clock_setup() {
    let codec = codec_with(MockRegmap::new());
    let aif = Aif::standard::<MockBusError>(2).unwrap();
    let mut delay = RecordingDelay::new();

    codec
        .set_sysclk(ClockId::Sysclk, ClockSource::FLL1, 98_304_000)
        .unwrap();
    codec.regmap().set(0x0740, 0x20);

    let out = codec
        .set_aif_rate(&mut delay, &aif, AifClock::Sysclk2, 96_000)
        .unwrap();
    assert_eq!(out, RateOutcome::Applied);
    assert_eq!(codec.regmap().get(SAMPLE_RATE_2), 4);
    assert_eq!(codec.regmap().writes_to(0x0740), vec![0, 0x20]);

    let again = codec
        .set_aif_rate(&mut delay, &aif, AifClock::Sysclk2, 48_000)
        .unwrap();
    assert_eq!(again, RateOutcome::Unchanged);
    assert_eq!(codec.regmap().get(SAMPLE_RATE_2), 3);
    assert_eq!(codec.regmap().writes_to(0x0740), vec![0, 0x20]);
}
