//! The full consumption report returned to clients.

use serde::Serialize;
use time::PrimitiveDateTime;

use pinte_types::types::iso_datetime;
use pinte_types::{ConsumptionRecord, RawRecord};

use crate::aggregate::{DailyTotal, GrandTotals, MonthlyTotal, aggregate};
use crate::error::{Result, validate_batch};
use crate::warnings::{WarningEpisode, detect_warnings};

/// A warning episode as presented in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningView {
    #[serde(flatten)]
    pub episode: WarningEpisode,
    #[serde(with = "iso_datetime")]
    pub expires_at: PrimitiveDateTime,
    /// Whether the episode was still active when the report was built.
    pub active: bool,
}

impl WarningView {
    /// Present an episode as seen at `now`.
    pub fn new(episode: WarningEpisode, now: PrimitiveDateTime) -> Self {
        Self {
            expires_at: episode.expires_at(),
            active: episode.is_active(now),
            episode,
        }
    }
}

/// Aggregated totals, warnings and the underlying records of a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionReport {
    pub daily_totals: Vec<DailyTotal>,
    pub monthly_totals: Vec<MonthlyTotal>,
    pub grand_totals: GrandTotals,
    /// Every detected episode, oldest first, expired ones included.
    pub warnings: Vec<WarningView>,
    /// Records sorted by timestamp.
    pub records: Vec<ConsumptionRecord>,
}

impl ConsumptionReport {
    /// Build a report from validated records.
    ///
    /// `now` only decides which warnings are flagged active.
    pub fn build(records: &[ConsumptionRecord], now: PrimitiveDateTime) -> Self {
        let aggregation = aggregate(records);
        let warnings = detect_warnings(records)
            .into_iter()
            .map(|episode| WarningView::new(episode, now))
            .collect();

        let mut records = records.to_vec();
        records.sort_by_key(ConsumptionRecord::timestamp);

        Self {
            daily_totals: aggregation.daily_totals,
            monthly_totals: aggregation.monthly_totals,
            grand_totals: aggregation.grand_totals,
            warnings,
            records,
        }
    }

    /// Validate a raw batch, then build the report.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::Validation`] if any record is malformed.
    pub fn build_raw(raw: &[RawRecord], now: PrimitiveDateTime) -> Result<Self> {
        let records = validate_batch(raw)?;
        Ok(Self::build(&records, now))
    }

    /// Episodes still active when the report was built.
    pub fn active_warnings(&self) -> impl Iterator<Item = &WarningEpisode> {
        self.warnings.iter().filter(|w| w.active).map(|w| &w.episode)
    }

    /// Whether the report covers no records at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
