//! Utility functions for Laurel.
//!
//! Streak bookkeeping works on whole UTC days: two instants belong to the
//! same streak day exactly when they share a UTC calendar date.

use chrono::{DateTime, Utc};

/// Number of whole UTC days between the midnights containing `a` and `b`.
///
/// Positive when `a` is on a later calendar date than `b`, negative when
/// earlier. Time-of-day is ignored entirely.
pub fn days_between_utc_midnights(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (a.date_naive() - b.date_naive()).num_days()
}

/// Compute the streak value after a read action at `now`.
///
/// - No previous login: streak starts at 1.
/// - Same UTC day: unchanged.
/// - Exactly one UTC day later: incremented.
/// - Any other gap (including clock skew backwards): reset to 1.
pub fn next_streak(current: u32, last_login: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    let Some(last) = last_login else {
        return 1;
    };
    match days_between_utc_midnights(now, last) {
        0 => current,
        1 => current + 1,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_same_day_is_zero() {
        assert_eq!(
            days_between_utc_midnights(at(2025, 3, 10, 23), at(2025, 3, 10, 0)),
            0
        );
    }

    #[test]
    fn test_adjacent_days_is_one_regardless_of_hours() {
        // 23:00 on the 10th to 00:00 on the 11th is one hour of wall time
        // but a full day boundary.
        assert_eq!(
            days_between_utc_midnights(at(2025, 3, 11, 0), at(2025, 3, 10, 23)),
            1
        );
    }

    #[test]
    fn test_month_boundary() {
        assert_eq!(
            days_between_utc_midnights(at(2025, 4, 1, 5), at(2025, 3, 31, 20)),
            1
        );
    }

    #[test]
    fn test_year_boundary() {
        assert_eq!(
            days_between_utc_midnights(at(2026, 1, 1, 1), at(2025, 12, 30, 1)),
            2
        );
    }

    #[test]
    fn test_negative_when_reversed() {
        assert_eq!(
            days_between_utc_midnights(at(2025, 3, 10, 0), at(2025, 3, 12, 0)),
            -2
        );
    }

    #[test]
    fn test_streak_starts_at_one_without_last_login() {
        assert_eq!(next_streak(7, None, at(2025, 3, 10, 12)), 1);
    }

    #[test]
    fn test_streak_unchanged_same_day() {
        let last = at(2025, 3, 10, 8);
        assert_eq!(next_streak(4, Some(last), at(2025, 3, 10, 22)), 4);
    }

    #[test]
    fn test_streak_increments_next_day() {
        let last = at(2025, 3, 10, 8);
        assert_eq!(next_streak(4, Some(last), at(2025, 3, 11, 6)), 5);
    }

    #[test]
    fn test_streak_resets_after_gap() {
        let last = at(2025, 3, 10, 8);
        assert_eq!(next_streak(4, Some(last), at(2025, 3, 13, 6)), 1);
    }

    #[test]
    fn test_streak_resets_on_backwards_clock() {
        let last = at(2025, 3, 10, 8);
        assert_eq!(next_streak(4, Some(last), at(2025, 3, 8, 6)), 1);
    }
}
