//! UTC calendar-day partition keys.
//!
//! A `DateKey` is always derived from the UTC date of an instant, so the same
//! instant maps to the same partition regardless of the local timezone.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical `YYYY-MM-DD` day key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Key for the UTC calendar day containing `instant`.
    #[must_use]
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self(instant.date_naive())
    }

    /// Key for the current UTC day.
    #[must_use]
    pub fn today() -> Self {
        Self::from_instant(Utc::now())
    }

    #[must_use]
    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a strict `YYYY-MM-DD` string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok().map(Self)
    }

    #[must_use]
    pub const fn date(self) -> NaiveDate {
        self.0
    }

    #[must_use]
    pub fn is_today(self) -> bool {
        self == Self::today()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid date key '{s}', expected YYYY-MM-DD"))
    }
}

impl TryFrom<String> for DateKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.to_string()
    }
}
