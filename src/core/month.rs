//! Calendar month values parsed from `YYYY-MM` tokens.
//!
//! A [`Month`] is stored as the first day of its month, so ordering months is
//! ordering dates.

use crate::errors::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar month, normalized to its first day
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    /// Parses a token that must match `^\d{4}-\d{2}$` exactly.
    ///
    /// Anything else (wrong length, missing dash, non-digits, month outside
    /// 1-12, year 0) fails with [`Error::MalformedMonth`].
    pub fn parse(value: &str) -> Result<Self> {
        let malformed = || Error::MalformedMonth {
            value: value.to_string(),
        };

        let bytes = value.as_bytes();
        let shape_ok = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..].iter().all(u8::is_ascii_digit);
        if !shape_ok {
            return Err(malformed());
        }

        let year: i32 = value[..4].parse().map_err(|_| malformed())?;
        let month: u32 = value[5..].parse().map_err(|_| malformed())?;
        if year < 1 {
            return Err(malformed());
        }
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or_else(malformed)
    }

    /// Month containing `date`.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self(NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date))
    }

    /// First calendar day of the month.
    #[must_use]
    pub const fn first_day(self) -> NaiveDate {
        self.0
    }

    /// Four-digit year.
    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// Month number, 1-12.
    #[must_use]
    pub fn month(self) -> u32 {
        self.0.month()
    }
}

impl From<Month> for NaiveDate {
    fn from(month: Month) -> Self {
        month.0
    }
}

impl FromStr for Month {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
