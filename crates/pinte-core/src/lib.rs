//! Aggregation and overconsumption-warning engine for Pinte.
//!
//! This crate turns a set of [`ConsumptionRecord`]s into the numbers a user
//! looks at: totals per day, per month and overall, plus warnings for
//! periods where more than 1.5 L was logged within three hours.
//!
//! Everything here is a pure function of its input. The engine never reads
//! the clock or touches storage; callers pass in the records and, where
//! expiry matters, the current time.
//!
//! # Features
//!
//! - **Aggregation**: [`aggregate`] groups records by day and calendar month
//! - **Warnings**: [`detect_warnings`] finds non-overlapping episodes over the threshold
//! - **Expiry**: [`WarningEpisode::is_active`] and [`active_warnings`] filter by a given instant
//! - **Reports**: [`ConsumptionReport`] bundles all of the above for a date range
//!
//! # Quick Start
//!
//! ```
//! use pinte_core::ConsumptionReport;
//! use pinte_types::ConsumptionRecord;
//! use time::macros::{date, datetime, time};
//!
//! let records = [
//!     ConsumptionRecord::new(date!(2024 - 03 - 15), time!(20:00)).with_pints(2),
//!     ConsumptionRecord::new(date!(2024 - 03 - 15), time!(21:30)).with_pints(2),
//! ];
//!
//! let report = ConsumptionReport::build(&records, datetime!(2024-03-15 22:00));
//! assert_eq!(report.grand_totals.pints, 4);
//! assert_eq!(report.active_warnings().count(), 1);
//! ```

pub mod aggregate;
pub mod error;
pub mod report;
pub mod warnings;

pub use aggregate::{
    Aggregation, DailyTotal, GrandTotals, MonthlyTotal, ParseYearMonthError, Tally, YearMonth,
    aggregate, aggregate_raw,
};
pub use error::{Error, Result, validate_batch};
pub use report::{ConsumptionReport, WarningView};
pub use warnings::{
    WARNING_EXPIRY, WARNING_THRESHOLD, WARNING_WINDOW, WarningEpisode, WarningItem,
    active_warnings, detect_warnings,
};

// Re-export from pinte-types
pub use pinte_types::{ConsumptionRecord, RawRecord, RecordError, Volume};
