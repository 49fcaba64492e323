use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

/// Calendar month used to name dated archive directories (`YYYY_MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthStamp {
    year: i32,
    month: u32,
}

impl MonthStamp {
    pub fn new(year: i32, month: u32) -> Result<Self, HarvestError> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(HarvestError::InvalidMonthStamp(format!("{year}_{month}")));
        }
        Ok(Self { year, month })
    }

    pub fn from_date<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Self::from_date(&chrono::Local::now())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for MonthStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}_{:02}", self.year, self.month)
    }
}

impl FromStr for MonthStamp {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let invalid = || HarvestError::InvalidMonthStamp(value.to_string());
        let (year, month) = trimmed.split_once('_').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for MonthStamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Where a job reads its month from when it provisions.
pub trait MonthSource {
    fn stamp(&self) -> MonthStamp;
}

/// The local calendar, read on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMonth;

impl MonthSource for SystemMonth {
    fn stamp(&self) -> MonthStamp {
        MonthStamp::current()
    }
}

/// A fixed stamp.
impl MonthSource for MonthStamp {
    fn stamp(&self) -> MonthStamp {
        *self
    }
}

/// File name of a remote archive; also its local file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceName {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed != "."
            && trimmed != ".."
            && !trimmed.contains(['/', '\\'])
            && !trimmed.chars().any(|ch| ch.is_control());
        if !is_valid {
            return Err(HarvestError::InvalidResourceName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for ResourceName {
    type Error = HarvestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceName> for String {
    fn from(value: ResourceName) -> Self {
        value.0
    }
}

/// One dataset to retrieve: where it lives locally and what to ask the portal for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub base_directory: Utf8PathBuf,
    pub category: String,
    pub resource: ResourceName,
}
