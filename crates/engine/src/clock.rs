//! Wall-clock abstraction.
//!
//! The runtime never calls `Utc::now()` directly; it asks a [`Clock`], so
//! tests can drive delays, backoff and timeouts with a [`ManualClock`].

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// `time` has been reached.
    fn is_past(&self, time: DateTime<Utc>) -> bool {
        self.now() >= time
    }

    /// `now + seconds`, saturating at the latest representable instant.
    fn add_interval(&self, seconds: u64) -> DateTime<Utc> {
        offset(self.now(), seconds)
    }
}

fn offset(from: DateTime<Utc>, seconds: u64) -> DateTime<Utc> {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|delta| from.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Start at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.current.lock() = time;
    }

    pub fn advance_seconds(&self, seconds: u64) {
        let mut current = self.current.lock();
        *current = offset(*current, seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let clock = ManualClock::new(epoch());
        assert_eq!(clock.now(), epoch());

        clock.advance_seconds(90);
        assert_eq!(clock.now(), epoch() + Duration::seconds(90));
    }

    #[test]
    fn is_past_includes_the_instant_itself() {
        let clock = ManualClock::new(epoch());
        let deadline = clock.add_interval(5);
        assert!(!clock.is_past(deadline));

        clock.advance_seconds(5);
        assert!(clock.is_past(deadline));
    }

    #[test]
    fn starting_now_begins_at_wall_clock_time() {
        let before = Utc::now();
        let clock = ManualClock::starting_now();
        let after = Utc::now();

        assert!(clock.now() >= before && clock.now() <= after);

        clock.set(epoch());
        assert_eq!(clock.now(), epoch());
    }

    #[test]
    fn huge_intervals_saturate() {
        let clock = ManualClock::new(epoch());
        assert_eq!(clock.add_interval(u64::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
