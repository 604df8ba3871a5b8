//! `YYYYMMDDHHMMSS` broadcast timestamps.
//!
//! The service addresses timefree content with 14-digit local timestamps.
//! Arithmetic is done on the calendar value itself, with no timezone attached.

use chrono::{Duration as ChronoDuration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

const FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RadikoTime(NaiveDateTime);

impl RadikoTime {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if value.len() != 14 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidTimestamp(value.to_string()));
        }
        NaiveDateTime::parse_from_str(value, FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::InvalidTimestamp(value.to_string()))
    }

    pub fn add_seconds(self, seconds: i64) -> Self {
        Self(self.0 + ChronoDuration::seconds(seconds))
    }

    pub fn add_minutes(self, minutes: i64) -> Self {
        Self(self.0 + ChronoDuration::minutes(minutes))
    }

    /// Seconds from `self` to `later`; negative when `later` is earlier.
    pub fn seconds_until(self, later: RadikoTime) -> i64 {
        (later.0 - self.0).num_seconds()
    }

    /// `YYYYMMDD`
    pub fn date_part(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// `HHMMSS`
    pub fn time_part(&self) -> String {
        self.0.format("%H%M%S").to_string()
    }
}

impl fmt::Display for RadikoTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl FromStr for RadikoTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RadikoTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RadikoTime> for String {
    fn from(value: RadikoTime) -> Self {
        value.to_string()
    }
}
