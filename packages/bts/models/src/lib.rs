#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Period and object key types for the monthly BTS on-time-performance
//! dataset.
//!
//! Every month of data lives in the bucket at
//! `bts-data/{year}/{month:02}/performance.csv`. The sync job derives all
//! of its state from those keys, so this crate owns both directions of the
//! mapping: [`Period::destination_key`] builds a key and
//! [`Period::from_key`] recovers the period from one.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix under which every monthly dataset is stored.
pub const BTS_PREFIX: &str = "bts-data/";

/// File name of the extracted CSV inside each period directory.
pub const PERFORMANCE_FILE: &str = "performance.csv";

/// Matches the `bts-data/{year}/{month}/` segment of a stored key.
static KEY_PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"bts-data/([0-9]{4})/([0-9]{2})/").expect("valid period key regex")
});

/// Latest representable year; keys and `YYYY-MM` text carry four digits.
pub const MAX_YEAR: u16 = 9999;

/// Errors produced when constructing or parsing a [`Period`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    /// Year beyond [`MAX_YEAR`].
    #[error("Invalid year {year} (expected at most {MAX_YEAR})")]
    InvalidYear {
        /// The rejected year value.
        year: u16,
    },

    /// Month outside `1..=12`.
    #[error("Invalid month {month} (expected 1-12)")]
    InvalidMonth {
        /// The rejected month value.
        month: u8,
    },

    /// Text that is not of the form `YYYY-MM`.
    #[error("Invalid period '{input}' (expected YYYY-MM)")]
    Unparsable {
        /// The rejected input.
        input: String,
    },
}

/// A (year, month) pair identifying one month's dataset.
///
/// Ordering is by year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    year: u16,
    month: u8,
}

/// Unvalidated serde shape of a [`Period`].
#[derive(Deserialize)]
struct RawPeriod {
    year: u16,
    month: u8,
}

impl TryFrom<RawPeriod> for Period {
    type Error = PeriodError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Self::new(raw.year, raw.month)
    }
}

impl Period {
    /// Creates a period, rejecting months outside `1..=12` and years past
    /// [`MAX_YEAR`].
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidMonth`] if `month` is not in `1..=12`,
    /// [`PeriodError::InvalidYear`] if `year` exceeds [`MAX_YEAR`].
    pub const fn new(year: u16, month: u8) -> Result<Self, PeriodError> {
        if year > MAX_YEAR {
            return Err(PeriodError::InvalidYear { year });
        }
        if month == 0 || month > 12 {
            return Err(PeriodError::InvalidMonth { month });
        }
        Ok(Self { year, month })
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> u16 {
        self.year
    }

    /// Calendar month, `1..=12`.
    #[must_use]
    pub const fn month(self) -> u8 {
        self.month
    }

    /// The period one month later. December rolls over to January of the
    /// following year; `None` after December of [`MAX_YEAR`].
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        if self.month < 12 {
            return Some(Self {
                year: self.year,
                month: self.month + 1,
            });
        }
        if self.year >= MAX_YEAR {
            return None;
        }
        Some(Self {
            year: self.year + 1,
            month: 1,
        })
    }

    /// Object key the extracted CSV for this period is stored under.
    #[must_use]
    pub fn destination_key(self) -> String {
        format!(
            "{BTS_PREFIX}{}/{:02}/{PERFORMANCE_FILE}",
            self.year, self.month
        )
    }

    /// Download URL of the archive for this period.
    ///
    /// The source publishes one zip per month named
    /// `{base}_{year}_{month}.zip`, with the month *not* zero padded.
    #[must_use]
    pub fn archive_url(self, base: &str) -> String {
        format!("{base}_{}_{}.zip", self.year, self.month)
    }

    /// Extracts the period from a stored object key.
    ///
    /// Matches a `bts-data/{YYYY}/{MM}/` segment anywhere in the key.
    /// Returns `None` for keys without that segment or with an
    /// out-of-range month.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let caps = KEY_PERIOD_RE.captures(key)?;
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        Self::new(year, month).ok()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparsable = || PeriodError::Unparsable {
            input: s.to_string(),
        };

        let (year, month) = s.trim().split_once('-').ok_or_else(unparsable)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(unparsable());
        }
        let year = year.parse().map_err(|_| unparsable())?;
        let month = month.parse().map_err(|_| unparsable())?;

        Self::new(year, month)
    }
}
