//! Calendar-day identifiers for day-files.
//!
//! A `DayId` names exactly one UTC calendar day and, through `file_name()`,
//! exactly one log file.  All rotation decisions go through this type.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EvidenceError, EvidenceResult};

/// Prefix shared by every day-file name.
pub const FILE_PREFIX: &str = "evidence-";

/// Extension shared by every day-file name.
pub const FILE_EXTENSION: &str = "jsonl";

const DAY_FORMAT: &str = "%Y-%m-%d";

/// A UTC calendar day, e.g. `2025-12-24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayId(NaiveDate);

impl DayId {
    /// The UTC calendar day `ts` falls on.
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        Self(ts.date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a `YYYY-MM-DD` string.
    ///
    /// Returns `EvidenceError::InvalidDay` for anything else, including
    /// out-of-range dates such as `2025-02-30`.
    pub fn parse(input: &str) -> EvidenceResult<Self> {
        NaiveDate::parse_from_str(input, DAY_FORMAT)
            .map(Self)
            .map_err(|_| EvidenceError::InvalidDay {
                input: input.to_string(),
            })
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The day-file name, e.g. `evidence-2025-12-24.jsonl`.
    pub fn file_name(&self) -> String {
        format!("{}{}.{}", FILE_PREFIX, self, FILE_EXTENSION)
    }
}

impl fmt::Display for DayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

impl FromStr for DayId {
    type Err = EvidenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DayId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
