//! Business calendar
//!
//! Treatment, claim and coverage dates are calendar dates in the insurer's
//! jurisdiction. Timestamps are stored in UTC and converted through the
//! configured timezone when a business date is needed.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Timezone wrapper
///
/// Wraps chrono_tz::Tz with string serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Tz::from_str(&s)
            .map(Timezone)
            .map_err(|_| serde::de::Error::custom(format!("Invalid timezone: {}", s)))
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(s.to_string()))
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Asia::Seoul)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} is after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Calendar arithmetic in the insurer's timezone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessCalendar {
    pub timezone: Timezone,
}

impl BusinessCalendar {
    pub fn new(timezone: Timezone) -> Self {
        Self { timezone }
    }

    /// Business date of a UTC instant
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone.0).date_naive()
    }

    /// Today's business date
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }

    /// Checks that `start <= end`
    pub fn check_period(start: NaiveDate, end: NaiveDate) -> Result<(), TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidPeriod { start, end });
        }
        Ok(())
    }

    /// Start of a trailing window of `days` days ending on `date`
    pub fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
        date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
    }

    /// Same day `months` calendar months earlier
    pub fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
        date.checked_sub_months(Months::new(months)).unwrap_or(NaiveDate::MIN)
    }

    /// Elapsed months between two dates counted as 30-day blocks
    pub fn elapsed_months(from: NaiveDate, to: NaiveDate) -> i64 {
        (to - from).num_days() / 30
    }

    /// Admission on a Friday with discharge on a Monday
    pub fn is_weekend_admission(start: NaiveDate, end: NaiveDate) -> bool {
        start.weekday() == Weekday::Fri && end.weekday() == Weekday::Mon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_seoul_date_crosses_utc_midnight() {
        let calendar = BusinessCalendar::default();
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 16, 0, 0).unwrap();
        assert_eq!(calendar.date_of(instant), date(2024, 3, 2));
    }

    #[test]
    fn test_weekend_admission() {
        assert!(BusinessCalendar::is_weekend_admission(date(2024, 3, 1), date(2024, 3, 4)));
        assert!(!BusinessCalendar::is_weekend_admission(date(2024, 3, 1), date(2024, 3, 5)));
    }

    #[test]
    fn test_elapsed_months_uses_thirty_day_blocks() {
        assert_eq!(BusinessCalendar::elapsed_months(date(2024, 1, 1), date(2024, 3, 31)), 3);
        assert_eq!(BusinessCalendar::elapsed_months(date(2024, 1, 1), date(2024, 1, 30)), 0);
    }

    #[test]
    fn test_check_period_rejects_reversed_dates() {
        assert!(BusinessCalendar::check_period(date(2024, 1, 2), date(2024, 1, 1)).is_err());
        assert!(BusinessCalendar::check_period(date(2024, 1, 1), date(2024, 1, 1)).is_ok());
    }

    #[test]
    fn test_timezone_serde_round_trip() {
        let tz: Timezone = serde_json::from_str("\"Asia/Seoul\"").unwrap();
        assert_eq!(tz, Timezone::default());
        assert!("Mars/Olympus".parse::<Timezone>().is_err());
    }
}
