//! Calendar-day keys and the "today" policy.
//!
//! # Responsibility
//! - Parse and format `YYYY-MM-DD` day keys used by completion maps.
//! - Turn a moment in time into a day key under an explicit boundary rule.
//!
//! # Invariants
//! - A `DayKey` always holds a valid calendar date.
//! - The string form is zero-padded `YYYY-MM-DD` and round-trips exactly.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";
const DAY_KEY_LEN: usize = 10;

/// Calendar day used as a completion-map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

/// Error returned when text is not a `YYYY-MM-DD` calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayKeyError {
    value: String,
}

impl Display for DayKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid day key `{}`; expected YYYY-MM-DD", self.value)
    }
}

impl Error for DayKeyError {}

impl DayKey {
    /// Parses a strict `YYYY-MM-DD` key.
    ///
    /// # Errors
    /// - Returns `DayKeyError` for wrong length, wrong separators or an
    ///   impossible date such as `2023-02-30`.
    pub fn parse(value: &str) -> Result<Self, DayKeyError> {
        let trimmed = value.trim();
        if trimmed.len() != DAY_KEY_LEN {
            return Err(DayKeyError {
                value: value.to_string(),
            });
        }
        NaiveDate::parse_from_str(trimmed, DAY_KEY_FORMAT)
            .map(Self)
            .map_err(|_| DayKeyError {
                value: value.to_string(),
            })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Returns the previous calendar day, or `None` at the minimum date.
    pub fn pred(self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }
}

impl Display for DayKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = DayKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Rule used to turn "now" into a calendar-day key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DayBoundary {
    /// Truncate the UTC date. Matches keys written by earlier web builds.
    #[default]
    Utc,
    /// Truncate the date in the device's local timezone.
    Local,
}

impl DayBoundary {
    /// Parses a config value (`utc|local`, case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "utc" => Some(Self::Utc),
            "local" => Some(Self::Local),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utc => "utc",
            Self::Local => "local",
        }
    }

    /// Returns the day key containing `now` under this boundary.
    pub fn day_of(self, now: DateTime<Utc>) -> DayKey {
        match self {
            Self::Utc => DayKey(now.date_naive()),
            Self::Local => DayKey(now.with_timezone(&Local).date_naive()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DayBoundary, DayKey};
    use chrono::{Duration, Local, TimeZone, Utc};

    #[test]
    fn parse_accepts_padded_calendar_dates() {
        let key = DayKey::parse("2024-01-01").expect("valid day key");
        assert_eq!(key.to_string(), "2024-01-01");

        let leap = DayKey::parse("2024-02-29").expect("leap day is valid");
        assert_eq!(leap.to_string(), "2024-02-29");
    }

    #[test]
    fn parse_rejects_malformed_and_impossible_dates() {
        for raw in ["2024-1-01", "2023-02-29", "2024/01/01", "", "2024-01-01T00:00"] {
            assert!(DayKey::parse(raw).is_err(), "`{raw}` should be rejected");
        }
    }

    #[test]
    fn pred_steps_across_month_boundary() {
        let key = DayKey::parse("2024-03-01").unwrap();
        assert_eq!(key.pred().unwrap().to_string(), "2024-02-29");
    }

    #[test]
    fn utc_boundary_truncates_utc_date() {
        let late = Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap();
        assert_eq!(DayBoundary::Utc.day_of(late).to_string(), "2024-05-31");
    }

    #[test]
    fn local_boundary_uses_device_timezone_date() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 31, 23, 30, 0).unwrap();
        let expected = DayKey::from_date(instant.with_timezone(&Local).date_naive());
        assert_eq!(DayBoundary::Local.day_of(instant), expected);

        let next_day = DayBoundary::Local.day_of(instant + Duration::days(1));
        assert_eq!(next_day.pred(), Some(expected));
    }

    #[test]
    fn boundary_parse_is_case_insensitive() {
        assert_eq!(DayBoundary::parse(" LOCAL "), Some(DayBoundary::Local));
        assert_eq!(DayBoundary::parse("utc"), Some(DayBoundary::Utc));
        assert_eq!(DayBoundary::parse("gmt"), None);
    }

    #[test]
    fn serde_uses_plain_string_form() {
        let key = DayKey::parse("2024-12-25").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2024-12-25\"");
        let decoded: DayKey = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, key);
    }
}
