//! Error types for pinte-core.
//!
//! The engine itself cannot fail on well-formed input: aggregation and
//! warning detection degrade to empty results for empty input. The only
//! failure is rejecting a batch of raw records because one of them is
//! malformed, in which case nothing from that batch is aggregated.

use pinte_types::{RawRecord, RecordError};

/// Result type for pinte-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pinte-core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A record in the batch failed validation.
    #[error("Invalid record at index {index}: {source}")]
    Validation {
        /// Position of the offending record in the input batch.
        index: usize,
        source: RecordError,
    },
}

impl Error {
    /// The underlying record error, if any.
    pub fn record_error(&self) -> Option<&RecordError> {
        match self {
            Error::Validation { source, .. } => Some(source),
        }
    }
}

/// Validate every record of a batch.
///
/// Stops at the first invalid record; a batch is accepted whole or not at all.
pub fn validate_batch(raw: &[RawRecord]) -> Result<Vec<pinte_types::ConsumptionRecord>> {
    raw.iter()
        .enumerate()
        .map(|(index, r)| r.validate().map_err(|source| Error::Validation { index, source }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(date: &str, pints: i64) -> RawRecord {
        RawRecord {
            date: date.to_string(),
            pints,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_batch_ok() {
        let records = validate_batch(&[raw("2024-01-01", 1), raw("2024-01-02", 2)]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].pints, 2);
    }

    #[test]
    fn test_validate_batch_reports_index() {
        let err = validate_batch(&[raw("2024-01-01", 1), raw("2024-01-02", -1), raw("bad", 1)])
            .unwrap_err();

        let Error::Validation { index, source } = &err;
        assert_eq!(*index, 1);
        assert!(matches!(source, RecordError::NegativeCount { field: "pints", .. }));
        assert!(err.to_string().contains("index 1"));
        assert!(err.record_error().is_some());
    }

    #[test]
    fn test_validate_empty_batch() {
        assert!(validate_batch(&[]).unwrap().is_empty());
    }
}
