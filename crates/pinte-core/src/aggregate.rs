//! Per-day, per-month and grand-total aggregation of consumption records.
//!
//! Aggregation is a pure function of its input: records may arrive in any
//! order and span any number of days or months. Days and months without a
//! record are absent from the result rather than present with zero values,
//! so consumers must treat a missing key as zero.
//!
//! # Example
//!
//! ```
//! use pinte_core::aggregate;
//! use pinte_types::ConsumptionRecord;
//! use time::macros::{date, time};
//!
//! let records = [
//!     ConsumptionRecord::new(date!(2024 - 03 - 01), time!(20:00)).with_pints(2),
//!     ConsumptionRecord::new(date!(2024 - 03 - 01), time!(22:00)).with_half_pints(1),
//!     ConsumptionRecord::new(date!(2024 - 04 - 10), time!(19:00)).with_liters_33(1),
//! ];
//!
//! let aggregation = aggregate(&records);
//! assert_eq!(aggregation.daily_totals.len(), 2);
//! assert_eq!(aggregation.monthly_totals.len(), 2);
//! assert_eq!(aggregation.grand_totals.liters.centiliters(), 158);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::Date;

use pinte_types::types::iso_date;
use pinte_types::{ConsumptionRecord, RawRecord, Volume};

use crate::error::{Result, validate_batch};

/// Running sums of drink counts and volume.
///
/// Used for a single day, a single month, or the whole input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Number of pints.
    pub pints: u64,
    /// Number of half-pints.
    pub half_pints: u64,
    /// Number of 33cl cans.
    pub liters_33: u64,
    /// Total volume (serialized in liters, two decimals).
    pub liters: Volume,
    /// Number of records that contributed.
    pub entries: u64,
}

impl Tally {
    /// Add one record to the sums.
    pub fn add(&mut self, record: &ConsumptionRecord) {
        self.pints += u64::from(record.pints);
        self.half_pints += u64::from(record.half_pints);
        self.liters_33 += u64::from(record.liters_33);
        self.liters += record.volume();
        self.entries += 1;
    }

    /// Merge another tally into this one.
    pub fn merge(&mut self, other: &Tally) {
        self.pints += other.pints;
        self.half_pints += other.half_pints;
        self.liters_33 += other.liters_33;
        self.liters += other.liters;
        self.entries += other.entries;
    }

    /// Total number of drinks of any kind.
    pub fn total_drinks(&self) -> u64 {
        self.pints + self.half_pints + self.liters_33
    }
}

/// Grand totals over a whole query.
pub type GrandTotals = Tally;

/// A calendar month, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    /// Calendar year.
    pub year: i32,
    /// Month number, 1 to 12.
    pub month: u8,
}

impl YearMonth {
    /// Month containing the given day.
    pub fn of(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month() as u8,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Error returned when parsing a [`YearMonth`] fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid month '{0}': expected YYYY-MM")]
pub struct ParseYearMonthError(String);

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParseYearMonthError(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u8 = month.parse().map_err(|_| err())?;
        if !(1..=12).contains(&month) {
            return Err(err());
        }
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Totals for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotal {
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(flatten)]
    pub totals: Tally,
}

/// Totals for one calendar month.
///
/// Serialized with the can count under both `liters_33` and `liters_33cl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MonthlyTotal {
    pub month: YearMonth,
    #[serde(flatten)]
    pub totals: Tally,
}

#[derive(Serialize)]
struct MonthlyTotalRepr<'a> {
    month: YearMonth,
    #[serde(flatten)]
    totals: &'a Tally,
    liters_33cl: u64,
}

impl Serialize for MonthlyTotal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        MonthlyTotalRepr {
            month: self.month,
            totals: &self.totals,
            liters_33cl: self.totals.liters_33,
        }
        .serialize(serializer)
    }
}

/// Result of aggregating a set of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    /// One entry per day with at least one record, oldest first.
    pub daily_totals: Vec<DailyTotal>,
    /// One entry per month with at least one record, oldest first.
    pub monthly_totals: Vec<MonthlyTotal>,
    /// Sums across every input record.
    pub grand_totals: GrandTotals,
}

impl Aggregation {
    /// Whether no records were aggregated.
    pub fn is_empty(&self) -> bool {
        self.grand_totals.entries == 0
    }

    /// Totals for a given day, `None` when nothing was logged that day.
    pub fn day(&self, date: Date) -> Option<&DailyTotal> {
        self.daily_totals
            .binary_search_by_key(&date, |d| d.date)
            .ok()
            .map(|i| &self.daily_totals[i])
    }

    /// Totals for a given month, `None` when nothing was logged that month.
    pub fn month(&self, month: YearMonth) -> Option<&MonthlyTotal> {
        self.monthly_totals
            .binary_search_by_key(&month, |m| m.month)
            .ok()
            .map(|i| &self.monthly_totals[i])
    }

    /// Re-derive grand totals from the daily totals.
    ///
    /// Always equal to [`Aggregation::grand_totals`].
    pub fn totals_from_daily(&self) -> GrandTotals {
        self.daily_totals.iter().fold(Tally::default(), |mut acc, d| {
            acc.merge(&d.totals);
            acc
        })
    }
}

/// Aggregate validated records.
pub fn aggregate(records: &[ConsumptionRecord]) -> Aggregation {
    let mut daily: BTreeMap<Date, Tally> = BTreeMap::new();
    let mut monthly: BTreeMap<YearMonth, Tally> = BTreeMap::new();
    let mut grand_totals = Tally::default();

    for record in records {
        daily.entry(record.date).or_default().add(record);
        monthly.entry(YearMonth::of(record.date)).or_default().add(record);
        grand_totals.add(record);
    }

    Aggregation {
        daily_totals: daily
            .into_iter()
            .map(|(date, totals)| DailyTotal { date, totals })
            .collect(),
        monthly_totals: monthly
            .into_iter()
            .map(|(month, totals)| MonthlyTotal { month, totals })
            .collect(),
        grand_totals,
    }
}

/// Validate then aggregate a batch of raw records.
///
/// # Errors
///
/// Returns [`crate::Error::Validation`] if any record is malformed; no
/// partial aggregation is returned in that case.
pub fn aggregate_raw(raw: &[RawRecord]) -> Result<Aggregation> {
    let records = validate_batch(raw)?;
    Ok(aggregate(&records))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use time::Time;

    fn arb_record() -> impl Strategy<Value = ConsumptionRecord> {
        (0i32..730, 0u8..24, 0u8..60, 0u32..5, 0u32..5, 0u32..5).prop_map(
            |(day_offset, hour, minute, p, h, c)| {
                let date = time::macros::date!(2023 - 01 - 01) + time::Duration::days(day_offset as i64);
                let time = Time::from_hms(hour, minute, 0).unwrap_or(Time::MIDNIGHT);
                ConsumptionRecord::new(date, time)
                    .with_pints(p)
                    .with_half_pints(h)
                    .with_liters_33(c)
            },
        )
    }

    proptest! {
        /// Daily liters always sum to the grand total.
        #[test]
        fn daily_liters_sum_to_grand_total(records in proptest::collection::vec(arb_record(), 0..60)) {
            let aggregation = aggregate(&records);
            let daily_sum: f64 = aggregation.daily_totals.iter().map(|d| d.totals.liters.liters()).sum();
            prop_assert!((daily_sum - aggregation.grand_totals.liters.liters()).abs() < 1e-6);
            prop_assert_eq!(aggregation.totals_from_daily(), aggregation.grand_totals);
        }

        /// Monthly totals partition the same records as daily totals.
        #[test]
        fn monthly_totals_match_grand_total(records in proptest::collection::vec(arb_record(), 0..60)) {
            let aggregation = aggregate(&records);
            let monthly: Volume = aggregation.monthly_totals.iter().map(|m| m.totals.liters).sum();
            prop_assert_eq!(monthly, aggregation.grand_totals.liters);
        }

        /// Input order does not matter.
        #[test]
        fn aggregation_is_order_independent(mut records in proptest::collection::vec(arb_record(), 0..40)) {
            let forward = aggregate(&records);
            records.reverse();
            prop_assert_eq!(aggregate(&records), forward);
        }

        /// Adding a record never decreases the total volume.
        #[test]
        fn totals_are_monotonic(records in proptest::collection::vec(arb_record(), 0..40), extra in arb_record()) {
            let before = aggregate(&records).grand_totals.liters;
            let mut more = records.clone();
            more.push(extra);
            prop_assert!(aggregate(&more).grand_totals.liters >= before);
        }
    }
}
