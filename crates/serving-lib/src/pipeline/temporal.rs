//! Temporal feature derivation for the route model
//!
//! Purchase date/time strings are expanded into the calendar features the
//! model was trained on. Malformed inputs never fail a request: they fall
//! back to a fixed default feature set and the substitution is logged.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use tracing::warn;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Epoch date some legacy exports prefix onto bare times.
const LEGACY_TIME_PREFIX: &str = "1900-01-01 ";

/// Calendar features derived from a purchase timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalFeatures {
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: u32,
    pub month: u32,
    pub quarter: u32,
    pub is_weekend: u32,
    pub hour: u32,
    /// [6,12) = 0, [12,18) = 1, [18,22) = 2, else 3.
    pub period_of_day: u32,
}

impl TemporalFeatures {
    /// Substituted when the date/time pair cannot be parsed.
    pub const FALLBACK: TemporalFeatures = TemporalFeatures {
        day_of_week: 0,
        month: 1,
        quarter: 1,
        is_weekend: 0,
        hour: 12,
        period_of_day: 1,
    };
}

fn strip_legacy_prefix(time: &str) -> &str {
    time.strip_prefix(LEGACY_TIME_PREFIX).unwrap_or(time)
}

fn period_of_day(hour: u32) -> u32 {
    match hour {
        6..=11 => 0,
        12..=17 => 1,
        18..=21 => 2,
        _ => 3,
    }
}

/// Derive calendar features from a "YYYY-MM-DD" date and "HH:MM:SS" time.
pub fn derive(date: &str, time: &str) -> Option<TemporalFeatures> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()?;
    let time = NaiveTime::parse_from_str(strip_legacy_prefix(time.trim()), TIME_FORMAT).ok()?;

    let day_of_week = date.weekday().num_days_from_monday();
    let month = date.month();
    let hour = time.hour();

    Some(TemporalFeatures {
        day_of_week,
        month,
        quarter: (month - 1) / 3 + 1,
        is_weekend: u32::from(day_of_week >= 5),
        hour,
        period_of_day: period_of_day(hour),
    })
}

/// Total variant of [`derive`]: malformed inputs resolve to the fallback
/// feature set instead of failing the request.
pub fn derive_or_default(date: &str, time: &str) -> TemporalFeatures {
    derive(date, time).unwrap_or_else(|| {
        warn!(date, time, "Unparseable purchase timestamp, using default temporal features");
        TemporalFeatures::FALLBACK
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wednesday_afternoon_derivation() {
        // 2018-12-05 is a Wednesday.
        let features = derive("2018-12-05", "15:07:57").unwrap();
        assert_eq!(features.day_of_week, 2);
        assert_eq!(features.month, 12);
        assert_eq!(features.quarter, 4);
        assert_eq!(features.is_weekend, 0);
        assert_eq!(features.hour, 15);
        assert_eq!(features.period_of_day, 1);
    }

    #[test]
    fn test_weekend_flag() {
        // 2018-12-08 is a Saturday, 2018-12-09 a Sunday.
        assert_eq!(derive("2018-12-08", "10:00:00").unwrap().is_weekend, 1);
        assert_eq!(derive("2018-12-09", "10:00:00").unwrap().is_weekend, 1);
        assert_eq!(derive("2018-12-07", "10:00:00").unwrap().is_weekend, 0);
    }

    #[test]
    fn test_period_of_day_boundaries() {
        let period = |h: u32| derive("2024-01-15", &format!("{h:02}:00:00")).unwrap().period_of_day;
        assert_eq!(period(5), 3);
        assert_eq!(period(6), 0);
        assert_eq!(period(11), 0);
        assert_eq!(period(12), 1);
        assert_eq!(period(17), 1);
        assert_eq!(period(18), 2);
        assert_eq!(period(21), 2);
        assert_eq!(period(22), 3);
        assert_eq!(period(0), 3);
    }

    #[test]
    fn test_quarter_derivation() {
        assert_eq!(derive("2024-01-01", "00:00:00").unwrap().quarter, 1);
        assert_eq!(derive("2024-03-31", "00:00:00").unwrap().quarter, 1);
        assert_eq!(derive("2024-04-01", "00:00:00").unwrap().quarter, 2);
        assert_eq!(derive("2024-12-31", "00:00:00").unwrap().quarter, 4);
    }

    #[test]
    fn test_legacy_time_prefix_is_tolerated() {
        let features = derive("2018-12-05", "1900-01-01 15:07:57").unwrap();
        assert_eq!(features.hour, 15);
    }

    #[test]
    fn test_malformed_inputs_fall_back_to_defaults() {
        assert_eq!(derive_or_default("not-a-date", "15:07:57"), TemporalFeatures::FALLBACK);
        assert_eq!(derive_or_default("2018-12-05", "25:99:00"), TemporalFeatures::FALLBACK);
        assert_eq!(derive_or_default("", ""), TemporalFeatures::FALLBACK);
        assert_eq!(derive_or_default("05/12/2018", "15:07:57"), TemporalFeatures::FALLBACK);
    }

    #[test]
    fn test_fallback_values_match_training_defaults() {
        let fallback = TemporalFeatures::FALLBACK;
        assert_eq!(
            (
                fallback.day_of_week,
                fallback.month,
                fallback.quarter,
                fallback.is_weekend,
                fallback.hour,
                fallback.period_of_day
            ),
            (0, 1, 1, 0, 12, 1)
        );
    }
}
