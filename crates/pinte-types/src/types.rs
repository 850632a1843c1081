//! Core types for consumption records.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

use crate::error::{RecordError, RecordResult};
use crate::volume::{CAN_33_CL, HALF_PINT_CL, PINT_CL, Volume};

/// Wire format for calendar days.
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Wire format for times of day.
pub const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");

/// Short time format accepted on input (seconds default to zero).
const TIME_FORMAT_SHORT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

#[cfg(feature = "serde")]
time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

#[cfg(feature = "serde")]
time::serde::format_description!(pub hms_time, Time, "[hour]:[minute]:[second]");

#[cfg(feature = "serde")]
time::serde::format_description!(
    pub iso_datetime,
    PrimitiveDateTime,
    "[year]-[month]-[day]T[hour]:[minute]:[second]"
);

/// Parse a `YYYY-MM-DD` calendar day.
pub fn parse_date(s: &str) -> RecordResult<Date> {
    Date::parse(s.trim(), DATE_FORMAT).map_err(|_| RecordError::InvalidDate(s.to_string()))
}

/// Parse an `HH:MM:SS` (or `HH:MM`) time of day.
pub fn parse_time(s: &str) -> RecordResult<Time> {
    let s_trimmed = s.trim();
    Time::parse(s_trimmed, TIME_FORMAT)
        .or_else(|_| Time::parse(s_trimmed, TIME_FORMAT_SHORT))
        .map_err(|_| RecordError::InvalidTime(s.to_string()))
}

/// Format a calendar day as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| format!("{:04}-{:02}-{:02}", date.year(), date.month() as u8, date.day()))
}

/// Format a time of day as `HH:MM:SS`.
pub fn format_time(time: Time) -> String {
    format!("{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second())
}

/// Kind of drink that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DrinkKind {
    /// A pint (0.5 L).
    Pint,
    /// A half-pint (0.25 L).
    HalfPint,
    /// A 33cl can or bottle.
    Can33,
}

impl DrinkKind {
    /// All drink kinds, in display order.
    pub const ALL: [DrinkKind; 3] = [DrinkKind::Pint, DrinkKind::HalfPint, DrinkKind::Can33];

    /// Volume of one drink of this kind.
    #[must_use]
    pub const fn volume(&self) -> Volume {
        match self {
            DrinkKind::Pint => Volume::from_centiliters(PINT_CL),
            DrinkKind::HalfPint => Volume::from_centiliters(HALF_PINT_CL),
            DrinkKind::Can33 => Volume::from_centiliters(CAN_33_CL),
        }
    }

    /// Field name used for this drink kind on the wire.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            DrinkKind::Pint => "pints",
            DrinkKind::HalfPint => "half_pints",
            DrinkKind::Can33 => "liters_33",
        }
    }
}

impl fmt::Display for DrinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrinkKind::Pint => write!(f, "pint"),
            DrinkKind::HalfPint => write!(f, "half-pint"),
            DrinkKind::Can33 => write!(f, "33cl"),
        }
    }
}

/// A single logged consumption entry.
///
/// Records are immutable: logging more drinks appends a new record rather
/// than editing an existing one, and several records may share a date (or
/// even a date and time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsumptionRecord {
    /// Calendar day of the entry.
    #[cfg_attr(feature = "serde", serde(with = "iso_date"))]
    pub date: Date,
    /// Time of day of the entry (second resolution).
    #[cfg_attr(feature = "serde", serde(with = "hms_time"))]
    pub time: Time,
    /// Number of pints.
    pub pints: u32,
    /// Number of half-pints.
    pub half_pints: u32,
    /// Number of 33cl cans.
    pub liters_33: u32,
}

impl ConsumptionRecord {
    /// Create a record at the given date and time with no drinks.
    ///
    /// Sub-second precision is dropped from `time`.
    #[must_use]
    pub fn new(date: Date, time: Time) -> Self {
        let time = time.replace_nanosecond(0).unwrap_or(time);
        Self {
            date,
            time,
            pints: 0,
            half_pints: 0,
            liters_33: 0,
        }
    }

    /// Set the number of pints.
    #[must_use]
    pub fn with_pints(mut self, pints: u32) -> Self {
        self.pints = pints;
        self
    }

    /// Set the number of half-pints.
    #[must_use]
    pub fn with_half_pints(mut self, half_pints: u32) -> Self {
        self.half_pints = half_pints;
        self
    }

    /// Set the number of 33cl cans.
    #[must_use]
    pub fn with_liters_33(mut self, liters_33: u32) -> Self {
        self.liters_33 = liters_33;
        self
    }

    /// Combined date and time of the entry.
    #[must_use]
    pub fn timestamp(&self) -> PrimitiveDateTime {
        PrimitiveDateTime::new(self.date, self.time)
    }

    /// Volume of everything in this record.
    #[must_use]
    pub fn volume(&self) -> Volume {
        Volume::from_counts(self.pints, self.half_pints, self.liters_33)
    }

    /// Volume in liters.
    #[must_use]
    pub fn liters(&self) -> f64 {
        self.volume().liters()
    }

    /// Count of one kind of drink.
    #[must_use]
    pub fn count(&self, kind: DrinkKind) -> u32 {
        match kind {
            DrinkKind::Pint => self.pints,
            DrinkKind::HalfPint => self.half_pints,
            DrinkKind::Can33 => self.liters_33,
        }
    }

    /// Total number of drinks regardless of kind.
    #[must_use]
    pub fn total_drinks(&self) -> u64 {
        self.pints as u64 + self.half_pints as u64 + self.liters_33 as u64
    }

    /// Whether the record holds no drinks at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_drinks() == 0
    }
}

impl fmt::Display for ConsumptionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} pint(s), {} half-pint(s), {} 33cl ({})",
            format_date(self.date),
            format_time(self.time),
            self.pints,
            self.half_pints,
            self.liters_33,
            self.volume()
        )
    }
}

/// An unvalidated record as it arrives from outside (HTTP body, CSV row).
///
/// Dates and times are plain strings and counts are signed so that malformed
/// input can be reported precisely instead of failing deep in a parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawRecord {
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:MM:SS` or `HH:MM`; midnight when absent.
    pub time: Option<String>,
    pub pints: i64,
    pub half_pints: i64,
    pub liters_33: i64,
}

impl RawRecord {
    /// Validate and convert into a [`ConsumptionRecord`].
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] for the first problem found: an unparseable
    /// date or time, a negative count, or a count too large to store.
    pub fn validate(&self) -> RecordResult<ConsumptionRecord> {
        let date = parse_date(&self.date)?;
        let time = match self.time.as_deref() {
            Some(t) if !t.trim().is_empty() => parse_time(t)?,
            _ => Time::MIDNIGHT,
        };

        Ok(ConsumptionRecord {
            date,
            time,
            pints: check_count("pints", self.pints)?,
            half_pints: check_count("half_pints", self.half_pints)?,
            liters_33: check_count("liters_33", self.liters_33)?,
        })
    }
}

impl From<&ConsumptionRecord> for RawRecord {
    fn from(record: &ConsumptionRecord) -> Self {
        Self {
            date: format_date(record.date),
            time: Some(format_time(record.time)),
            pints: record.pints as i64,
            half_pints: record.half_pints as i64,
            liters_33: record.liters_33 as i64,
        }
    }
}

impl TryFrom<&RawRecord> for ConsumptionRecord {
    type Error = RecordError;

    fn try_from(raw: &RawRecord) -> Result<Self, Self::Error> {
        raw.validate()
    }
}

/// Validate a single drink count.
pub fn check_count(field: &'static str, value: i64) -> RecordResult<u32> {
    if value < 0 {
        return Err(RecordError::NegativeCount { field, value });
    }
    u32::try_from(value).map_err(|_| RecordError::CountOverflow { field, value })
}
