//! Shared types for the Pinte consumption tracker.
//!
//! This crate holds the data model used by the engine (`pinte-core`), the
//! record store (`pinte-store`) and the HTTP service (`pinte-service`).
//!
//! # Features
//!
//! - [`ConsumptionRecord`]: an immutable, validated drink log entry
//! - [`RawRecord`]: untrusted input and its boundary validation
//! - [`Volume`] and [`to_liters`]: the single place drink counts turn into liters
//! - [`RecordError`]: validation failures
//!
//! # Example
//!
//! ```
//! use pinte_types::RawRecord;
//!
//! let raw = RawRecord {
//!     date: "2024-03-15".to_string(),
//!     time: Some("21:30:00".to_string()),
//!     pints: 2,
//!     ..Default::default()
//! };
//!
//! let record = raw.validate()?;
//! assert_eq!(record.liters(), 1.0);
//! # Ok::<(), pinte_types::RecordError>(())
//! ```

pub mod error;
pub mod types;
pub mod volume;

pub use error::{RecordError, RecordResult};
pub use types::{
    ConsumptionRecord, DATE_FORMAT, DrinkKind, RawRecord, TIME_FORMAT, check_count, format_date,
    format_time, parse_date, parse_time,
};
pub use volume::{CAN_33_CL, HALF_PINT_CL, PINT_CL, Volume, round_liters, to_liters};

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    fn raw(date: &str, time: Option<&str>, pints: i64, half_pints: i64, liters_33: i64) -> RawRecord {
        RawRecord {
            date: date.to_string(),
            time: time.map(str::to_string),
            pints,
            half_pints,
            liters_33,
        }
    }

    // --- RawRecord validation tests ---

    #[test]
    fn test_validate_full_record() {
        let record = raw("2024-03-15", Some("21:30:15"), 2, 1, 3).validate().unwrap();

        assert_eq!(record.date, date!(2024 - 03 - 15));
        assert_eq!(record.time, time!(21:30:15));
        assert_eq!(record.pints, 2);
        assert_eq!(record.half_pints, 1);
        assert_eq!(record.liters_33, 3);
    }

    #[test]
    fn test_validate_missing_time_is_midnight() {
        let record = raw("2024-03-15", None, 1, 0, 0).validate().unwrap();
        assert_eq!(record.time, time!(00:00:00));

        let record = raw("2024-03-15", Some("  "), 1, 0, 0).validate().unwrap();
        assert_eq!(record.time, time!(00:00:00));
    }

    #[test]
    fn test_validate_short_time() {
        let record = raw("2024-03-15", Some("18:05"), 1, 0, 0).validate().unwrap();
        assert_eq!(record.time, time!(18:05:00));
    }

    #[test]
    fn test_validate_negative_count() {
        let err = raw("2024-03-15", None, 1, -2, 0).validate().unwrap_err();
        assert_eq!(
            err,
            RecordError::NegativeCount {
                field: "half_pints",
                value: -2
            }
        );
        assert!(err.to_string().contains("half_pints cannot be negative"));
    }

    #[test]
    fn test_validate_count_overflow() {
        let err = raw("2024-03-15", None, 0, 0, i64::from(u32::MAX) + 1)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::CountOverflow {
                field: "liters_33",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_bad_date() {
        for bad in ["", "2024-13-01", "2024-02-30", "15/03/2024", "yesterday"] {
            let err = raw(bad, None, 1, 0, 0).validate().unwrap_err();
            assert!(
                matches!(err, RecordError::InvalidDate(_)),
                "expected invalid date for {bad:?}"
            );
        }
    }

    #[test]
    fn test_validate_bad_time() {
        for bad in ["25:00:00", "12:60:00", "noon", "12"] {
            let err = raw("2024-03-15", Some(bad), 1, 0, 0).validate().unwrap_err();
            assert!(
                matches!(err, RecordError::InvalidTime(_)),
                "expected invalid time for {bad:?}"
            );
        }
    }

    #[test]
    fn test_raw_record_round_trip() {
        let record = ConsumptionRecord::new(date!(2024 - 01 - 02), time!(08:09:10))
            .with_pints(1)
            .with_liters_33(2);
        let raw = RawRecord::from(&record);

        assert_eq!(raw.date, "2024-01-02");
        assert_eq!(raw.time.as_deref(), Some("08:09:10"));
        assert_eq!(ConsumptionRecord::try_from(&raw).unwrap(), record);
    }

    // --- ConsumptionRecord tests ---

    #[test]
    fn test_record_volume_and_counts() {
        let record = ConsumptionRecord::new(date!(2024 - 03 - 15), time!(20:00))
            .with_pints(1)
            .with_half_pints(2)
            .with_liters_33(1);

        assert_eq!(record.volume().centiliters(), 133);
        assert!((record.liters() - 1.33).abs() < 1e-9);
        assert_eq!(record.total_drinks(), 4);
        assert_eq!(record.count(DrinkKind::HalfPint), 2);
        assert!(!record.is_empty());
    }

    #[test]
    fn test_record_drops_subseconds() {
        let record = ConsumptionRecord::new(date!(2024 - 03 - 15), time!(20:00:01.5));
        assert_eq!(record.time, time!(20:00:01));
        assert!(record.is_empty());
    }

    #[test]
    fn test_record_timestamp_ordering() {
        let earlier = ConsumptionRecord::new(date!(2024 - 03 - 15), time!(23:59));
        let later = ConsumptionRecord::new(date!(2024 - 03 - 16), time!(00:01));
        assert!(earlier.timestamp() < later.timestamp());
    }

    #[test]
    fn test_record_display() {
        let record = ConsumptionRecord::new(date!(2024 - 03 - 15), time!(20:00)).with_pints(3);
        assert_eq!(
            record.to_string(),
            "2024-03-15 20:00:00: 3 pint(s), 0 half-pint(s), 0 33cl (1.50 L)"
        );
    }

    // --- DrinkKind tests ---

    #[test]
    fn test_drink_kind_volumes_match_conversion() {
        for kind in DrinkKind::ALL {
            let record = match kind {
                DrinkKind::Pint => ConsumptionRecord::new(date!(2024 - 01 - 01), time!(12:00)).with_pints(1),
                DrinkKind::HalfPint => {
                    ConsumptionRecord::new(date!(2024 - 01 - 01), time!(12:00)).with_half_pints(1)
                }
                DrinkKind::Can33 => {
                    ConsumptionRecord::new(date!(2024 - 01 - 01), time!(12:00)).with_liters_33(1)
                }
            };
            assert_eq!(record.volume(), kind.volume(), "{kind}");
        }
    }

    #[test]
    fn test_drink_kind_fields() {
        assert_eq!(DrinkKind::Pint.field(), "pints");
        assert_eq!(DrinkKind::HalfPint.field(), "half_pints");
        assert_eq!(DrinkKind::Can33.field(), "liters_33");
        assert_eq!(DrinkKind::Can33.to_string(), "33cl");
    }

    // --- Serialization tests ---

    #[cfg(feature = "serde")]
    #[test]
    fn test_record_serializes_wire_formats() {
        let record = ConsumptionRecord::new(date!(2024 - 03 - 05), time!(07:08:09)).with_pints(1);
        let json = serde_json::to_value(record).unwrap();

        assert_eq!(json["date"], "2024-03-05");
        assert_eq!(json["time"], "07:08:09");
        assert_eq!(json["pints"], 1);
        assert_eq!(json["half_pints"], 0);

        let back: ConsumptionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_raw_record_defaults() {
        let raw: RawRecord = serde_json::from_str(r#"{"date": "2024-03-05", "pints": 2}"#).unwrap();
        assert_eq!(raw.time, None);
        assert_eq!(raw.half_pints, 0);
        assert_eq!(raw.liters_33, 0);
        assert_eq!(raw.validate().unwrap().pints, 2);
    }
}
