//! UTC Calendar Helpers
//!
//! Every day boundary in the economy (ad quota, challenge issue date) is a
//! UTC midnight. Callers pass `now` in explicitly; nothing here reads the
//! system clock.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Point in time used across the engine.
pub type Timestamp = DateTime<Utc>;

/// Calendar day (UTC) containing `now`.
#[inline]
pub fn utc_day(now: Timestamp) -> NaiveDate {
    now.date_naive()
}

/// Midnight UTC opening `day`.
pub fn start_of_day(day: NaiveDate) -> Timestamp {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// Half-open window `[start_of_utc_day(now), start_of_utc_day(now) + 1 day)`.
pub fn day_window(now: Timestamp) -> (Timestamp, Timestamp) {
    let start = start_of_day(utc_day(now));
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_window_bounds() {
        let now = Utc.with_ymd_and_hms(2026, 5, 17, 23, 59, 59).unwrap();
        let (start, end) = day_window(now);

        assert_eq!(start, Utc.with_ymd_and_hms(2026, 5, 17, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 5, 18, 0, 0, 0).unwrap());
        assert!(start <= now && now < end);
    }

    #[test]
    fn test_midnight_belongs_to_new_day() {
        let midnight = Utc.with_ymd_and_hms(2026, 5, 18, 0, 0, 0).unwrap();
        assert_eq!(utc_day(midnight), NaiveDate::from_ymd_opt(2026, 5, 18).unwrap());
        assert_eq!(day_window(midnight).0, midnight);
    }
}
