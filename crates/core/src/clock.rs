// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time.
///
/// Every timestamp in the status areas is second-granular wall time, while
/// dispatch deadlines use the monotonic clock. The dispatcher is generic
/// over this trait so tests can drive time deterministically.
pub trait Clock: Clone + Send + Sync {
    /// Monotonic now, for deadlines and sleeps.
    fn now(&self) -> Instant;

    /// Seconds since the Unix epoch, for persisted timestamps.
    fn epoch_secs(&self) -> u64;
}

/// System clock for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Manually advanced clock for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone)]
pub struct FakeClock {
    start: Instant,
    epoch_start: u64,
    offset: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeClock {
    /// A fake clock starting at an arbitrary fixed epoch.
    pub fn new() -> Self {
        Self::at_epoch(1_700_000_000)
    }

    /// A fake clock starting at the given epoch second.
    pub fn at_epoch(epoch_start: u64) -> Self {
        Self {
            start: Instant::now(),
            epoch_start,
            offset: std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }
    }

    /// Advance both the monotonic and wall clock.
    pub fn advance(&self, d: Duration) {
        self.offset
            .fetch_add(d.as_secs(), std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start
            + Duration::from_secs(self.offset.load(std::sync::atomic::Ordering::SeqCst))
    }

    fn epoch_secs(&self) -> u64 {
        self.epoch_start + self.offset.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
