//! Time sources
//!
//! The tracker never calls `Utc::now()` directly. Production code uses
//! [`SystemClock`]; replays and tests drive a [`ManualClock`] forward explicitly
//! so debounce and dwell thresholds are deterministic.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock with millisecond resolution.
///
/// Clones share the same instant, so a test can keep one handle while the
/// aggregator owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Move the clock forward by `ms` milliseconds
    pub fn advance_ms(&self, ms: i64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jump to an absolute instant
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.millis.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or_default()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Milliseconds elapsed from `from` to `to` (negative if `to` is earlier)
pub fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_milliseconds()
}

/// `at` shifted forward by `ms` milliseconds, saturating at the latest
/// representable instant
pub fn after_ms(at: DateTime<Utc>, ms: u64) -> DateTime<Utc> {
    let ms = i64::try_from(ms).unwrap_or(i64::MAX);
    at.checked_add_signed(Duration::milliseconds(ms))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let handle = clock.clone();

        handle.advance_ms(1500);

        assert_eq!(elapsed_ms(start, clock.now()), 1500);
    }

    #[test]
    fn test_after_ms() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        assert_eq!(elapsed_ms(start, after_ms(start, 150)), 150);
    }

    #[test]
    fn test_after_ms_saturates() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        assert_eq!(after_ms(start, 100_000_000_000_000_000), DateTime::<Utc>::MAX_UTC);
        assert_eq!(after_ms(start, u64::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
