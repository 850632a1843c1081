//! Error types for record validation in pinte-types.

use thiserror::Error;

/// Errors raised when an untrusted record fails boundary validation.
///
/// A record that fails validation never reaches aggregation or warning
/// detection; callers reject it (or the whole batch containing it).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RecordError {
    /// A drink count was below zero.
    #[error("{field} cannot be negative (got {value})")]
    NegativeCount { field: &'static str, value: i64 },

    /// A drink count does not fit the stored integer width.
    #[error("{field} is too large (got {value})")]
    CountOverflow { field: &'static str, value: i64 },

    /// The date could not be parsed as `YYYY-MM-DD`.
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The time could not be parsed as `HH:MM:SS` or `HH:MM`.
    #[error("Invalid time '{0}': expected HH:MM:SS")]
    InvalidTime(String),
}

/// Result type alias using pinte-types' RecordError type.
pub type RecordResult<T> = std::result::Result<T, RecordError>;
