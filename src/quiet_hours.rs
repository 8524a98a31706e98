//! # Quiet Hours Policy
//!
//! Harold lives in a residence hall, so overnight it plays at a lower
//! ambient volume. The window differs by day type:
//!
//! - **Weekdays** (Monday to Friday): quiet while `(hour + 1) % 24 < 8`,
//!   i.e. 23:00 through 06:59.
//! - **Weekends** (Saturday and Sunday): quiet while `(hour + 23) % 24 < 6`,
//!   i.e. 01:00 through 06:59.
//!
//! The policy is a pure function of wall-clock time and holds no state.

use chrono::{Datelike, Timelike};

/// Ambient volume applied during quiet hours.
pub const QUIET_VOLUME: u8 = 85;

/// Ambient volume applied outside quiet hours.
pub const NORMAL_VOLUME: u8 = 100;

/// Returns true if `hour` on the given day falls within quiet hours.
///
/// `day_index` counts from Monday (0) to Sunday (6); anything above 4 is
/// treated as a weekend day.
pub fn is_quiet_hours(day_index: u32, hour: u32) -> bool {
    if day_index > 4 {
        (hour + 23) % 24 < 6
    } else {
        (hour + 1) % 24 < 8
    }
}

/// Evaluates [`is_quiet_hours`] for a chrono date/time.
pub fn quiet_hours_at<T: Datelike + Timelike>(time: &T) -> bool {
    is_quiet_hours(time.weekday().num_days_from_monday(), time.hour())
}

/// Ambient volume for the given wall-clock time.
pub fn ambient_volume<T: Datelike + Timelike>(time: &T) -> u8 {
    if quiet_hours_at(time) {
        QUIET_VOLUME
    } else {
        NORMAL_VOLUME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_weekday_matches_formula_for_every_hour() {
        for day in 0..=4 {
            for hour in 0..24 {
                assert_eq!(
                    is_quiet_hours(day, hour),
                    (hour + 1) % 24 < 8,
                    "weekday {day} hour {hour}"
                );
            }
        }
    }

    #[test]
    fn test_weekend_matches_formula_for_every_hour() {
        for day in 5..=6 {
            for hour in 0..24 {
                assert_eq!(
                    is_quiet_hours(day, hour),
                    (hour + 23) % 24 < 6,
                    "weekend {day} hour {hour}"
                );
            }
        }
    }

    #[test]
    fn test_weekday_boundaries() {
        assert!(is_quiet_hours(0, 23));
        assert!(is_quiet_hours(0, 0));
        assert!(is_quiet_hours(2, 6));
        assert!(!is_quiet_hours(2, 7));
        assert!(!is_quiet_hours(2, 8));
        assert!(!is_quiet_hours(4, 22));
    }

    #[test]
    fn test_weekend_boundaries() {
        assert!(!is_quiet_hours(5, 0));
        assert!(is_quiet_hours(5, 1));
        assert!(is_quiet_hours(6, 5));
        assert!(is_quiet_hours(6, 6));
        assert!(!is_quiet_hours(6, 7));
        assert!(!is_quiet_hours(6, 23));
    }

    #[test]
    fn test_ambient_volume_from_datetime() {
        // 2024-03-06 is a Wednesday, 2024-03-09 a Saturday.
        let wednesday_late = NaiveDate::from_ymd_opt(2024, 3, 6)
            .and_then(|d| d.and_hms_opt(23, 30, 0))
            .unwrap();
        let wednesday_noon = NaiveDate::from_ymd_opt(2024, 3, 6)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        let saturday_midnight = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(0, 15, 0))
            .unwrap();
        let saturday_early = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(3, 0, 0))
            .unwrap();

        assert_eq!(ambient_volume(&wednesday_late), QUIET_VOLUME);
        assert_eq!(ambient_volume(&wednesday_noon), NORMAL_VOLUME);
        assert_eq!(ambient_volume(&saturday_midnight), NORMAL_VOLUME);
        assert_eq!(ambient_volume(&saturday_early), QUIET_VOLUME);
    }
}
