//! Sliding-window overconsumption detection.
//!
//! Records are laid out on a single timeline (date and time combined). For
//! each record the detector looks at every record that follows within
//! [`WARNING_WINDOW`] (inclusive). If the summed volume of that window is
//! strictly greater than [`WARNING_THRESHOLD`], the window opens a
//! [`WarningEpisode`]. Later windows that start inside the episode and are
//! also over the threshold extend it to their last record, so a run of heavy
//! drinking is reported once and episodes never overlap. An extended episode
//! can therefore span more than [`WARNING_WINDOW`].
//!
//! Expiry is kept apart from detection: [`WarningEpisode::is_active`] and
//! [`active_warnings`] take the current instant explicitly, so the detector
//! never reads the clock.
//!
//! # Example
//!
//! ```
//! use pinte_core::detect_warnings;
//! use pinte_types::ConsumptionRecord;
//! use time::macros::{date, datetime, time};
//!
//! let day = date!(2024 - 03 - 15);
//! let records = [
//!     ConsumptionRecord::new(day, time!(10:00)).with_pints(2),
//!     ConsumptionRecord::new(day, time!(12:00)).with_pints(1),
//!     ConsumptionRecord::new(day, time!(13:00)).with_half_pints(1),
//! ];
//!
//! let episodes = detect_warnings(&records);
//! assert_eq!(episodes.len(), 1);
//! assert_eq!(episodes[0].total_liters.liters(), 1.75);
//! assert!(episodes[0].is_active(datetime!(2024-03-15 15:59)));
//! assert!(!episodes[0].is_active(datetime!(2024-03-15 16:00)));
//! ```

use serde::{Deserialize, Serialize};
use time::{Duration, PrimitiveDateTime};
use tracing::debug;

use pinte_types::types::iso_datetime;
use pinte_types::{ConsumptionRecord, Volume};

/// Volume that must be exceeded within a window to raise a warning (1.5 L).
pub const WARNING_THRESHOLD: Volume = Volume::from_centiliters(150);

/// Maximum span between the first and last record of a single window.
pub const WARNING_WINDOW: Duration = Duration::hours(3);

/// How long an episode stays active after its last record.
pub const WARNING_EXPIRY: Duration = Duration::hours(3);

/// One record contributing to a warning episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningItem {
    #[serde(with = "iso_datetime")]
    pub time: PrimitiveDateTime,
    pub liters: Volume,
}

/// A detected period of overconsumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningEpisode {
    /// Timestamp of the first contributing record.
    #[serde(with = "iso_datetime")]
    pub start_time: PrimitiveDateTime,
    /// Timestamp of the last contributing record.
    #[serde(with = "iso_datetime")]
    pub end_time: PrimitiveDateTime,
    /// Summed volume of every item (serialized rounded to two decimals).
    pub total_liters: Volume,
    /// Contributing records in chronological order.
    pub items: Vec<WarningItem>,
}

impl WarningEpisode {
    /// Instant after which the episode is no longer shown.
    pub fn expires_at(&self) -> PrimitiveDateTime {
        self.end_time.saturating_add(WARNING_EXPIRY)
    }

    /// Whether the episode should still be surfaced at `now`.
    pub fn is_active(&self, now: PrimitiveDateTime) -> bool {
        now < self.expires_at()
    }

    /// Time between the first and last record.
    pub fn span(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// Detect every overconsumption episode in a set of records.
///
/// Input order does not matter; records are stable-sorted by timestamp first.
/// Records holding no drinks are ignored. Returns episodes oldest first.
pub fn detect_warnings(records: &[ConsumptionRecord]) -> Vec<WarningEpisode> {
    let mut timeline: Vec<(PrimitiveDateTime, Volume)> = records
        .iter()
        .filter(|r| !r.is_empty())
        .map(|r| (r.timestamp(), r.volume()))
        .collect();
    timeline.sort_by_key(|(at, _)| *at);

    let mut episodes = Vec::new();
    let mut start = 0;
    let mut end = 0;
    let mut window = Volume::ZERO;

    // window always holds the volume of timeline[start..end]
    while start < timeline.len() {
        extend_window(&timeline, start, &mut end, &mut window);

        if window <= WARNING_THRESHOLD {
            window = window.saturating_sub(timeline[start].1);
            start += 1;
            continue;
        }

        // Slide the start through the episode; any later window that is
        // still over the threshold and reaches further extends it.
        let first = start;
        let mut last = end;
        loop {
            window = window.saturating_sub(timeline[start].1);
            start += 1;
            if start >= last {
                break;
            }
            extend_window(&timeline, start, &mut end, &mut window);
            if window > WARNING_THRESHOLD {
                last = last.max(end);
            }
        }

        let episode = build_episode(&timeline[first..last]);
        debug!(
            "Overconsumption from {} to {}: {}",
            episode.start_time, episode.end_time, episode.total_liters
        );
        episodes.push(episode);
    }

    episodes
}

/// Grow `end` while records stay within [`WARNING_WINDOW`] of `timeline[start]`.
fn extend_window(
    timeline: &[(PrimitiveDateTime, Volume)],
    start: usize,
    end: &mut usize,
    window: &mut Volume,
) {
    let anchor = timeline[start].0;
    while *end < timeline.len() && timeline[*end].0 - anchor <= WARNING_WINDOW {
        *window += timeline[*end].1;
        *end += 1;
    }
}

/// Keep only the episodes still active at `now`.
pub fn active_warnings(
    episodes: &[WarningEpisode],
    now: PrimitiveDateTime,
) -> impl Iterator<Item = &WarningEpisode> {
    episodes.iter().filter(move |e| e.is_active(now))
}

fn build_episode(run: &[(PrimitiveDateTime, Volume)]) -> WarningEpisode {
    let total_liters = run.iter().map(|&(_, liters)| liters).sum();
    let items: Vec<WarningItem> = run
        .iter()
        .map(|&(time, liters)| WarningItem { time, liters })
        .collect();

    WarningEpisode {
        start_time: run[0].0,
        end_time: run[run.len() - 1].0,
        total_liters,
        items,
    }
}
