//! Wall-clock provider used for credential expiry checks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current wall-clock time.
pub trait ClockProvider: Send + Sync {
    /// Seconds since the UNIX epoch.
    fn unix_seconds(&self) -> i64;

    /// Check if this is a mock clock.
    fn is_mock(&self) -> bool;
}

/// System time.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealClock;

impl ClockProvider for RealClock {
    fn unix_seconds(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }

    fn is_mock(&self) -> bool {
        false
    }
}

/// A clock that only moves when told to.
///
/// # Example
///
/// ```
/// use gantry_core::testing::{ClockProvider, MockClock};
/// use std::time::Duration;
///
/// let clock = MockClock::at(1_700_000_000);
/// clock.advance(Duration::from_secs(60));
/// assert_eq!(clock.unix_seconds(), 1_700_000_060);
/// ```
#[derive(Debug)]
pub struct MockClock {
    seconds: AtomicI64,
}

impl MockClock {
    /// Fix the clock at `unix_seconds`.
    pub fn at(unix_seconds: i64) -> Self {
        Self {
            seconds: AtomicI64::new(unix_seconds),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        self.seconds
            .fetch_add(duration.as_secs() as i64, Ordering::SeqCst);
    }
}

impl ClockProvider for MockClock {
    fn unix_seconds(&self) -> i64 {
        self.seconds.load(Ordering::SeqCst)
    }

    fn is_mock(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_does_not_advance_automatically() {
        let clock = MockClock::at(10);
        assert_eq!(clock.unix_seconds(), 10);
        assert_eq!(clock.unix_seconds(), 10);
    }

    #[test]
    fn real_clock_is_recent() {
        assert!(RealClock.unix_seconds() > 1_600_000_000);
        assert!(!RealClock.is_mock());
    }
}
