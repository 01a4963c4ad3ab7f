use chrono::{DateTime, Utc};

/// Source of the current time. Services hold an `Arc<dyn Clock>` so tests
/// can pin "now".
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Seconds left on a timer of `limit_seconds` started at `started_at`,
/// never negative.
pub fn seconds_remaining(started_at: DateTime<Utc>, limit_seconds: i32, now: DateTime<Utc>) -> i64 {
    let elapsed = (now - started_at).num_seconds();
    (i64::from(limit_seconds) - elapsed).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn remaining_counts_down_and_clamps() {
        let start = Utc.with_ymd_and_hms(2026, 5, 2, 8, 0, 0).unwrap();
        assert_eq!(seconds_remaining(start, 1800, start), 1800);
        assert_eq!(seconds_remaining(start, 1800, start + Duration::seconds(600)), 1200);
        assert_eq!(seconds_remaining(start, 1800, start + Duration::hours(2)), 0);
    }

    #[test]
    fn mock_clock_pins_now() {
        let pinned = Utc.with_ymd_and_hms(2026, 5, 2, 8, 10, 0).unwrap();
        let mut clock = MockClock::new();
        clock.expect_now().return_const(pinned);
        let start = pinned - Duration::seconds(90);
        assert_eq!(seconds_remaining(start, 900, clock.now()), 810);
    }
}
