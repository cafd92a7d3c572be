//! Mock implementations for testing
//!
//! Host-side doubles for the platform traits, used by unit and integration
//! tests of the clocking core. Every register access is logged so tests can
//! assert on exact write sequences.

#![cfg(any(test, feature = "std"))]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::{RegisterMap, RuntimePower};

/// One logged register access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Register read
    Read(u32),
    /// Register write (register, value)
    Write(u32, u32),
}

/// Error returned by [`MockRegmap`] for injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockBusError {
    /// Register whose access failed
    pub reg: u32,
}

impl core::fmt::Display for MockBusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "mock bus error at register {:#06x}", self.reg)
    }
}

impl std::error::Error for MockBusError {}

/// Status-bit mirror: a write to `from_reg` with any of `from_mask` set
/// raises `to_mask` in `to_reg`; clearing them lowers it again.
#[derive(Debug, Clone, Copy)]
struct Mirror {
    from_reg: u32,
    from_mask: u32,
    to_reg: u32,
    to_mask: u32,
}

#[derive(Debug, Default)]
struct Inner {
    regs: BTreeMap<u32, u32>,
    log: Vec<Access>,
    fail_read: BTreeSet<u32>,
    fail_write: BTreeSet<u32>,
    mirrors: Vec<Mirror>,
}

/// Mock register map
///
/// Unwritten registers read as zero. Accesses are serialized by an internal
/// mutex, like a bus-backed register cache.
#[derive(Debug, Default)]
pub struct MockRegmap {
    inner: Mutex<Inner>,
    access_delay: Option<Duration>,
}

impl MockRegmap {
    /// Create an empty register map
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` on every access (widens race windows in thread tests)
    #[must_use]
    pub fn with_access_delay(mut self, delay: Duration) -> Self {
        self.access_delay = Some(delay);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A test thread that panicked mid-access leaves the data usable.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn pause(&self) {
        if let Some(delay) = self.access_delay {
            std::thread::sleep(delay);
        }
    }

    /// Preload a register without logging
    pub fn set(&self, reg: u32, val: u32) {
        self.lock().regs.insert(reg, val);
    }

    /// Current register value without logging
    pub fn get(&self, reg: u32) -> u32 {
        self.lock().regs.get(&reg).copied().unwrap_or(0)
    }

    /// Every logged access, oldest first
    pub fn log(&self) -> Vec<Access> {
        self.lock().log.clone()
    }

    /// Logged writes only, oldest first
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.lock()
            .log
            .iter()
            .filter_map(|a| match *a {
                Access::Write(reg, val) => Some((reg, val)),
                Access::Read(_) => None,
            })
            .collect()
    }

    /// Logged writes to one register, oldest first
    pub fn writes_to(&self, reg: u32) -> Vec<u32> {
        self.writes()
            .into_iter()
            .filter_map(|(r, v)| (r == reg).then_some(v))
            .collect()
    }

    /// Forget the access log
    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    /// Make every read of `reg` fail
    pub fn fail_read(&self, reg: u32) {
        self.lock().fail_read.insert(reg);
    }

    /// Make every write to `reg` fail
    pub fn fail_write(&self, reg: u32) {
        self.lock().fail_write.insert(reg);
    }

    /// Stop injecting failures
    pub fn clear_failures(&self) {
        let mut inner = self.lock();
        inner.fail_read.clear();
        inner.fail_write.clear();
    }

    /// Mirror `from_mask` in `from_reg` onto `to_mask` in `to_reg` on write.
    ///
    /// Used to model status bits that follow a control bit, e.g. a lock flag
    /// raised when an FLL is enabled.
    pub fn mirror(&self, from_reg: u32, from_mask: u32, to_reg: u32, to_mask: u32) {
        self.lock().mirrors.push(Mirror {
            from_reg,
            from_mask,
            to_reg,
            to_mask,
        });
    }
}

impl RegisterMap for MockRegmap {
    type Error = MockBusError;

    fn read(&self, reg: u32) -> Result<u32, Self::Error> {
        self.pause();
        let mut inner = self.lock();
        inner.log.push(Access::Read(reg));
        if inner.fail_read.contains(&reg) {
            return Err(MockBusError { reg });
        }
        Ok(inner.regs.get(&reg).copied().unwrap_or(0))
    }

    fn write(&self, reg: u32, val: u32) -> Result<(), Self::Error> {
        self.pause();
        let mut inner = self.lock();
        inner.log.push(Access::Write(reg, val));
        if inner.fail_write.contains(&reg) {
            return Err(MockBusError { reg });
        }
        inner.regs.insert(reg, val);

        let mirrors: Vec<Mirror> = inner
            .mirrors
            .iter()
            .copied()
            .filter(|m| m.from_reg == reg)
            .collect();
        for m in mirrors {
            let status = inner.regs.entry(m.to_reg).or_insert(0);
            if val & m.from_mask == 0 {
                *status &= !m.to_mask;
            } else {
                *status |= m.to_mask;
            }
        }
        Ok(())
    }
}

/// Mock runtime power domain with acquire / release counters
#[derive(Debug, Default)]
pub struct MockPower {
    acquires: AtomicUsize,
    releases: AtomicUsize,
    suspended: AtomicBool,
}

impl MockPower {
    /// Create an active (not suspended) power domain
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the device as runtime-suspended (or not)
    pub fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::SeqCst);
    }

    /// Number of `acquire` calls so far
    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    /// Number of `release_deferred` calls so far
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Outstanding references (acquires minus releases)
    pub fn held(&self) -> isize {
        let acquired = isize::try_from(self.acquires()).unwrap_or(isize::MAX);
        let released = isize::try_from(self.releases()).unwrap_or(isize::MAX);
        acquired.saturating_sub(released)
    }
}

impl RuntimePower for MockPower {
    fn acquire(&self) {
        self.acquires.fetch_add(1, Ordering::SeqCst);
    }

    fn release_deferred(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }
}

/// Delay provider that records requested waits instead of sleeping
#[derive(Debug, Default, Clone)]
pub struct RecordingDelay {
    waits_ns: Vec<u32>,
}

impl RecordingDelay {
    /// Create a delay with an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested waits in nanoseconds, oldest first
    pub fn waits_ns(&self) -> &[u32] {
        &self.waits_ns
    }

    /// Requested waits rounded down to microseconds
    pub fn waits_us(&self) -> Vec<u32> {
        self.waits_ns.iter().map(|ns| ns / 1_000).collect()
    }

    /// Total requested time in microseconds
    pub fn total_us(&self) -> u64 {
        self.waits_ns.iter().map(|&ns| u64::from(ns) / 1_000).sum()
    }
}

impl embedded_hal::delay::DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waits_ns.push(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.waits_ns.push(us.saturating_mul(1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.waits_ns.push(ms.saturating_mul(1_000_000));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use embedded_hal::delay::DelayNs;

    #[test]
    fn unwritten_register_reads_zero() {
        let map = MockRegmap::new();
        assert_eq!(map.read(0x170).unwrap(), 0);
        assert_eq!(map.log(), vec![Access::Read(0x170)]);
    }

    #[test]
    fn injected_write_failure_leaves_value() {
        let map = MockRegmap::new();
        map.set(0x101, 0x44);
        map.fail_write(0x101);
        assert_eq!(map.write(0x101, 0), Err(MockBusError { reg: 0x101 }));
        assert_eq!(map.get(0x101), 0x44);
    }

    #[test]
    fn mirror_follows_control_bit() {
        let map = MockRegmap::new();
        map.mirror(0x171, 0x1, 0x1881, 0x0100);
        map.write(0x171, 0x1).unwrap();
        assert_eq!(map.get(0x1881), 0x0100);
        map.write(0x171, 0x0).unwrap();
        assert_eq!(map.get(0x1881), 0);
    }

    #[test]
    fn update_bits_logs_read_before_write() {
        let map = MockRegmap::new();
        map.update_bits(0x120, 0x7800, 0x0800).unwrap();
        assert_eq!(
            map.log(),
            vec![Access::Read(0x120), Access::Write(0x120, 0x0800)]
        );
    }

    #[test]
    fn power_counts_references() {
        let pm = MockPower::new();
        pm.acquire();
        pm.acquire();
        pm.release_deferred();
        assert_eq!(pm.held(), 1);
        assert!(!pm.is_suspended());
    }

    #[test]
    fn recording_delay_normalizes_units() {
        let mut d = RecordingDelay::new();
        d.delay_us(32);
        d.delay_ms(10);
        assert_eq!(d.waits_us(), vec![32, 10_000]);
        assert_eq!(d.total_us(), 10_032);
    }
}
