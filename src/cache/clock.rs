//! Time source shared by the TTL extractor, the header normalizer and the store.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to. Useful for deterministic tests.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use rttp_cache::cache::{Clock, ManualClock, epoch_millis};
///
/// let clock = ManualClock::at_millis(1_000);
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(epoch_millis(clock.now()), 11_000);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock fixed at `millis` since the Unix epoch.
    pub fn at_millis(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }

    /// Jumps to an absolute time.
    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        from_epoch_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Milliseconds since the Unix epoch; negative before it.
pub fn epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_millis()).unwrap_or(i64::MAX),
    }
}

/// The inverse of [`epoch_millis`].
pub fn from_epoch_millis(millis: i64) -> SystemTime {
    let magnitude = Duration::from_millis(millis.unsigned_abs());
    if millis >= 0 {
        UNIX_EPOCH + magnitude
    } else {
        UNIX_EPOCH - magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_round_trip() {
        for millis in [0, 1_451_610_000_000, -5_000] {
            assert_eq!(epoch_millis(from_epoch_millis(millis)), millis);
        }
    }

    #[test]
    fn manual_clock_moves_only_on_request() {
        let clock = ManualClock::at_millis(1_000);
        assert_eq!(epoch_millis(clock.now()), 1_000);
        clock.advance(Duration::from_millis(40_000));
        assert_eq!(epoch_millis(clock.now()), 41_000);
        clock.set_millis(5);
        assert_eq!(epoch_millis(clock.now()), 5);
    }
}
