//! Data models for stored data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use pinte_types::ConsumptionRecord;

/// A consumption record as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Database row ID.
    pub id: i64,
    /// The logged entry.
    #[serde(flatten)]
    pub record: ConsumptionRecord,
    /// When the row was written.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl StoredRecord {
    /// Discard storage metadata.
    pub fn into_record(self) -> ConsumptionRecord {
        self.record
    }
}

impl From<StoredRecord> for ConsumptionRecord {
    fn from(stored: StoredRecord) -> Self {
        stored.record
    }
}
