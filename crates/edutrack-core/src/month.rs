//! Calendar month used to key fee records.
//!
//! Written `MM/YYYY` at every boundary (forms, JSON, query strings). Ordering
//! is chronological, which the `MM/YYYY` string form is not.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
  // Field order matters: the derived `Ord` compares year first.
  year:  i32,
  month: u32,
}

impl Month {
  pub fn new(year: i32, month: u32) -> Result<Self> {
    if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
      return Err(Error::InvalidMonth(format!("{month:02}/{year}")));
    }
    Ok(Self { year, month })
  }

  /// The month containing `date`.
  pub fn of(date: NaiveDate) -> Self {
    Self { year: date.year(), month: date.month() }
  }

  pub fn year(&self) -> i32 { self.year }

  pub fn month(&self) -> u32 { self.month }

  /// Sortable `YYYY-MM` form used as the storage key.
  pub fn storage_key(&self) -> String {
    format!("{:04}-{:02}", self.year, self.month)
  }

  /// Parse the `YYYY-MM` storage key.
  pub fn from_storage_key(s: &str) -> Result<Self> {
    let (year, month) = s
      .split_once('-')
      .ok_or_else(|| Error::InvalidMonth(s.to_owned()))?;
    let year = year.parse().map_err(|_| Error::InvalidMonth(s.to_owned()))?;
    let month = month.parse().map_err(|_| Error::InvalidMonth(s.to_owned()))?;
    Self::new(year, month)
  }
}

impl fmt::Display for Month {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}/{:04}", self.month, self.year)
  }
}

impl FromStr for Month {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidMonth(s.to_owned());
    let (month, year) = s.trim().split_once('/').ok_or_else(invalid)?;
    if month.len() != 2 || year.len() != 4 {
      return Err(invalid());
    }
    let month = month.parse().map_err(|_| invalid())?;
    let year = year.parse().map_err(|_| invalid())?;
    Self::new(year, month).map_err(|_| invalid())
  }
}

impl TryFrom<String> for Month {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl From<Month> for String {
  fn from(m: Month) -> Self { m.to_string() }
}
