//! Main store implementation.

use std::path::Path;

use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

use pinte_types::{
    ConsumptionRecord, RawRecord, format_date, format_time, parse_date, parse_time,
};

use crate::error::{Error, Result};
use crate::models::StoredRecord;
use crate::queries::RecordQuery;
use crate::schema;

/// Header row written by [`Store::export_csv`] and expected by [`Store::import_csv`].
pub const CSV_HEADER: [&str; 5] = ["date", "time", "pints", "half_pints", "liters_33"];

/// Read and append access to consumption records.
///
/// The HTTP service depends on this rather than on [`Store`] directly.
pub trait RecordStore {
    /// Append one record and return its row id.
    fn append_record(&self, record: &ConsumptionRecord) -> Result<i64>;

    /// Records whose date falls in the inclusive range, oldest first.
    ///
    /// A missing bound is unbounded on that side.
    fn list_records(
        &self,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<Vec<ConsumptionRecord>>;
}

/// Outcome of importing records from CSV or JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportResult {
    /// Rows found in the input.
    pub total: usize,
    /// Rows appended to the store.
    pub imported: usize,
    /// Rows rejected as invalid.
    pub skipped: usize,
    /// One message per rejected row.
    pub errors: Vec<String>,
}

/// SQLite-based store for consumption records.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

// Record operations
impl Store {
    /// Append a record. Never merges with existing rows.
    pub fn append_record(&self, record: &ConsumptionRecord) -> Result<i64> {
        insert(&self.conn, record)?;
        let id = self.conn.last_insert_rowid();
        debug!("Appended record {}: {}", id, record);
        Ok(id)
    }

    /// Records whose date falls in the inclusive range, oldest first.
    pub fn list_records(
        &self,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<Vec<ConsumptionRecord>> {
        let stored = self.query_records(&RecordQuery::range(start, end))?;
        Ok(stored.into_iter().map(StoredRecord::into_record).collect())
    }

    /// Query records with filters.
    pub fn query_records(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok(RecordRow {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    time: row.get(2)?,
                    pints: row.get(3)?,
                    half_pints: row.get(4)?,
                    liters_33: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(RecordRow::decode).collect()
    }

    /// Count records whose date falls in the inclusive range.
    pub fn count_records(&self, start: Option<Date>, end: Option<Date>) -> Result<u64> {
        let (where_clause, params) = RecordQuery::range(start, end).build_where();
        let sql = format!("SELECT COUNT(*) FROM consumption {where_clause}");

        let count: i64 = self.conn.query_row(
            &sql,
            rusqlite::params_from_iter(params.iter()),
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }
}

impl RecordStore for Store {
    fn append_record(&self, record: &ConsumptionRecord) -> Result<i64> {
        Store::append_record(self, record)
    }

    fn list_records(
        &self,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<Vec<ConsumptionRecord>> {
        Store::list_records(self, start, end)
    }
}

// Export and import
impl Store {
    /// Export matching records as CSV with a [`CSV_HEADER`] row.
    pub fn export_csv(&self, query: &RecordQuery) -> Result<String> {
        let records = self.query_records(query)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        wtr.write_record(CSV_HEADER)?;
        for stored in &records {
            wtr.serialize(RawRecord::from(&stored.record))?;
        }

        let bytes = wtr.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        info!("Exported {} records as CSV", records.len());
        Ok(content)
    }

    /// Export matching records as a pretty-printed JSON array.
    pub fn export_json(&self, query: &RecordQuery) -> Result<String> {
        let records: Vec<ConsumptionRecord> = self
            .query_records(query)?
            .into_iter()
            .map(StoredRecord::into_record)
            .collect();

        info!("Exported {} records as JSON", records.len());
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Import records from CSV.
    ///
    /// Invalid rows are skipped and reported by line number; every valid row
    /// is appended in a single transaction.
    pub fn import_csv(&self, data: &str) -> Result<ImportResult> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(data.as_bytes());

        let mut rows = Vec::new();
        for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
            // header is line 1
            let line = index + 2;
            rows.push(
                result
                    .map_err(|e| format!("Line {line}: {e}"))
                    .and_then(|row| {
                        row.into_raw()
                            .validate()
                            .map_err(|e| format!("Line {line}: {e}"))
                    }),
            );
        }

        self.append_batch(rows)
    }

    /// Import records from a JSON array.
    ///
    /// Entries use the same shape as the append endpoint; `time` and counts
    /// may be omitted.
    pub fn import_json(&self, data: &str) -> Result<ImportResult> {
        let values: Vec<serde_json::Value> = serde_json::from_str(data)?;

        let rows = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                serde_json::from_value::<RawRecord>(value)
                    .map_err(|e| format!("Entry {index}: {e}"))
                    .and_then(|raw| raw.validate().map_err(|e| format!("Entry {index}: {e}")))
            })
            .collect();

        self.append_batch(rows)
    }

    fn append_batch(
        &self,
        rows: Vec<std::result::Result<ConsumptionRecord, String>>,
    ) -> Result<ImportResult> {
        let mut result = ImportResult {
            total: rows.len(),
            ..Default::default()
        };

        let tx = self.conn.unchecked_transaction()?;
        for row in rows {
            match row {
                Ok(record) => {
                    insert(&tx, &record)?;
                    result.imported += 1;
                }
                Err(message) => {
                    warn!("Skipping import row: {}", message);
                    result.skipped += 1;
                    result.errors.push(message);
                }
            }
        }
        tx.commit()?;

        info!(
            "Imported {} of {} records ({} skipped)",
            result.imported, result.total, result.skipped
        );
        Ok(result)
    }
}

fn insert(conn: &Connection, record: &ConsumptionRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO consumption (date, time, pints, half_pints, liters_33, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            format_date(record.date),
            format_time(record.time),
            record.pints,
            record.half_pints,
            record.liters_33,
            OffsetDateTime::now_utc().unix_timestamp(),
        ],
    )?;
    Ok(())
}

/// A row as read from SQLite, before date and time are decoded.
struct RecordRow {
    id: i64,
    date: String,
    time: String,
    pints: u32,
    half_pints: u32,
    liters_33: u32,
    created_at: i64,
}

impl RecordRow {
    fn decode(self) -> Result<StoredRecord> {
        let invalid = |what: &str| Error::InvalidTimestamp(format!("row {}: {what}", self.id));

        let date = parse_date(&self.date).map_err(|_| invalid(&self.date))?;
        let time = parse_time(&self.time).map_err(|_| invalid(&self.time))?;
        let created_at = OffsetDateTime::from_unix_timestamp(self.created_at)
            .map_err(|_| invalid(&self.created_at.to_string()))?;

        Ok(StoredRecord {
            id: self.id,
            record: ConsumptionRecord::new(date, time)
                .with_pints(self.pints)
                .with_half_pints(self.half_pints)
                .with_liters_33(self.liters_33),
            created_at,
        })
    }
}

/// One CSV line. Empty count cells read as zero and an empty time as midnight.
///
/// Also accepts the French headers (`Date,Pintes,Demis,33cl`) of older
/// exports, which carry no time column.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date")]
    date: String,
    #[serde(default)]
    time: Option<String>,
    #[serde(default, alias = "Pintes")]
    pints: Option<i64>,
    #[serde(default, alias = "Demis")]
    half_pints: Option<i64>,
    #[serde(default, alias = "33cl")]
    liters_33: Option<i64>,
}

impl CsvRow {
    fn into_raw(self) -> RawRecord {
        RawRecord {
            date: self.date,
            time: self.time,
            pints: self.pints.unwrap_or(0),
            half_pints: self.half_pints.unwrap_or(0),
            liters_33: self.liters_33.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    fn record(day: Date, at: time::Time, pints: u32) -> ConsumptionRecord {
        ConsumptionRecord::new(day, at).with_pints(pints)
    }

    fn seeded() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.append_record(&record(date!(2024 - 02 - 28), time!(20:00), 1)).unwrap();
        store.append_record(&record(date!(2024 - 03 - 01), time!(21:00), 2)).unwrap();
        store.append_record(&record(date!(2024 - 03 - 01), time!(18:00), 3)).unwrap();
        store.append_record(&record(date!(2024 - 03 - 02), time!(12:00), 4)).unwrap();
        store
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.list_records(None, None).unwrap().is_empty());
        assert_eq!(store.count_records(None, None).unwrap(), 0);
    }

    #[test]
    fn test_append_returns_increasing_ids() {
        let store = Store::open_in_memory().unwrap();
        let first = store.append_record(&record(date!(2024 - 01 - 01), time!(12:00), 1)).unwrap();
        let second = store.append_record(&record(date!(2024 - 01 - 01), time!(12:00), 1)).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_same_timestamp_not_merged() {
        let store = Store::open_in_memory().unwrap();
        let entry = record(date!(2024 - 01 - 01), time!(12:00), 1);
        store.append_record(&entry).unwrap();
        store.append_record(&entry).unwrap();

        let records = store.list_records(None, None).unwrap();
        assert_eq!(records, vec![entry, entry]);
    }

    #[test]
    fn test_list_records_chronological() {
        let store = seeded();
        let records = store.list_records(None, None).unwrap();

        let pints: Vec<u32> = records.iter().map(|r| r.pints).collect();
        assert_eq!(pints, vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_list_records_inclusive_range() {
        let store = seeded();

        let march = store.list_records(Some(date!(2024 - 03 - 01)), Some(date!(2024 - 03 - 01))).unwrap();
        assert_eq!(march.len(), 2);

        let from = store.list_records(Some(date!(2024 - 03 - 01)), None).unwrap();
        assert_eq!(from.len(), 3);

        let to = store.list_records(None, Some(date!(2024 - 02 - 29))).unwrap();
        assert_eq!(to.len(), 1);

        assert_eq!(store.count_records(Some(date!(2024 - 03 - 01)), None).unwrap(), 3);
    }

    #[test]
    fn test_list_records_inverted_range_is_empty() {
        let store = seeded();
        let records = store.list_records(Some(date!(2024 - 03 - 02)), Some(date!(2024 - 02 - 28))).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_query_records_pagination() {
        let store = seeded();

        let newest = store.query_records(&RecordQuery::new().limit(1)).unwrap();
        assert_eq!(newest[0].record.pints, 4);

        let page = store.query_records(&RecordQuery::new().limit(2).offset(1)).unwrap();
        let pints: Vec<u32> = page.iter().map(|s| s.record.pints).collect();
        assert_eq!(pints, vec![2, 3]);
    }

    #[test]
    fn test_same_instant_ordered_by_insertion() {
        let store = Store::open_in_memory().unwrap();
        let first = store.append_record(&record(date!(2024 - 01 - 01), time!(12:00), 1)).unwrap();
        let second = store.append_record(&record(date!(2024 - 01 - 01), time!(12:00), 2)).unwrap();

        let newest = store.query_records(&RecordQuery::new()).unwrap();
        let ids: Vec<i64> = newest.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second, first]);

        let oldest = store.query_records(&RecordQuery::new().oldest_first()).unwrap();
        let ids: Vec<i64> = oldest.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn test_record_store_trait() {
        fn total_pints<S: RecordStore>(store: &S) -> u32 {
            store.list_records(None, None).unwrap().iter().map(|r| r.pints).sum()
        }

        let store = seeded();
        RecordStore::append_record(&store, &record(date!(2024 - 03 - 03), time!(12:00), 5)).unwrap();
        assert_eq!(total_pints(&store), 15);
    }

    #[test]
    fn test_corrupt_row_surfaces_error() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO consumption (date, time, pints, created_at)
                 VALUES ('not-a-date', '12:00:00', 1, 0)",
                [],
            )
            .unwrap();

        let err = store.list_records(None, None).unwrap_err();
        assert!(matches!(err, Error::InvalidTimestamp(_)));
    }

    #[test]
    fn test_export_csv() {
        let store = seeded();
        let csv = store.export_csv(&RecordQuery::new().oldest_first()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "date,time,pints,half_pints,liters_33");
        assert_eq!(lines[1], "2024-02-28,20:00:00,1,0,0");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_export_csv_empty_has_header() {
        let store = Store::open_in_memory().unwrap();
        let csv = store.export_csv(&RecordQuery::new()).unwrap();
        assert_eq!(csv.trim_end(), "date,time,pints,half_pints,liters_33");
    }

    #[test]
    fn test_export_json() {
        let store = seeded();
        let json = store.export_json(&RecordQuery::new().limit(1)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed[0]["date"], "2024-03-02");
        assert_eq!(parsed[0]["pints"], 4);
    }

    #[test]
    fn test_csv_export_import_round_trip() {
        let source = seeded();
        let csv = source.export_csv(&RecordQuery::new()).unwrap();

        let target = Store::open_in_memory().unwrap();
        let result = target.import_csv(&csv).unwrap();

        assert_eq!(result.total, 4);
        assert_eq!(result.imported, 4);
        assert!(result.errors.is_empty());
        assert_eq!(
            target.list_records(None, None).unwrap(),
            source.list_records(None, None).unwrap()
        );
    }

    #[test]
    fn test_import_csv_defaults_and_errors() {
        let store = Store::open_in_memory().unwrap();
        let data = "date,time,pints,half_pints,liters_33\n\
                    2024-01-01,,2,,\n\
                    2024-01-02,19:30,,1,1\n\
                    2024-13-01,12:00:00,1,0,0\n\
                    2024-01-03,12:00:00,-1,0,0\n\
                    2024-01-04,12:00:00,many,0,0\n";

        let result = store.import_csv(data).unwrap();
        assert_eq!(result.total, 5);
        assert_eq!(result.imported, 2);
        assert_eq!(result.skipped, 3);
        assert!(result.errors[0].starts_with("Line 4:"));
        assert!(result.errors[1].starts_with("Line 5:"));
        assert!(result.errors[2].starts_with("Line 6:"));

        let records = store.list_records(None, None).unwrap();
        assert_eq!(records[0].time, time!(00:00));
        assert_eq!(records[0].pints, 2);
        assert_eq!(records[0].half_pints, 0);
        assert_eq!(records[1].time, time!(19:30));
        assert_eq!(records[1].volume().centiliters(), 58);
    }

    #[test]
    fn test_import_csv_french_headers() {
        let store = Store::open_in_memory().unwrap();
        let data = "Date,Pintes,Demis,33cl\n\
                    2024-01-05,2,1,0\n\
                    2024-01-06,,,3\n";

        let result = store.import_csv(data).unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.imported, 2);
        assert!(result.errors.is_empty());

        let records = store.list_records(None, None).unwrap();
        assert_eq!(records[0].date, date!(2024 - 01 - 05));
        assert_eq!(records[0].time, time!(00:00));
        assert_eq!(records[0].pints, 2);
        assert_eq!(records[0].half_pints, 1);
        assert_eq!(records[1].time, time!(00:00));
        assert_eq!(records[1].liters_33, 3);
    }

    #[test]
    fn test_import_csv_ignores_extra_columns() {
        let store = Store::open_in_memory().unwrap();
        let data = "Utilisateur,Date,Pintes,Demis,33cl\n\
                    alice,2024-01-05,1,0,0\n";

        let result = store.import_csv(data).unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(store.count_records(None, None).unwrap(), 1);
    }

    #[test]
    fn test_import_json() {
        let store = Store::open_in_memory().unwrap();
        let data = r#"[
            {"date": "2024-01-01", "time": "20:00:00", "pints": 1},
            {"date": "2024-01-01", "half_pints": 2},
            {"date": "2024-01-02", "pints": "two"},
            {"date": "2024-01-03", "liters_33": -4}
        ]"#;

        let result = store.import_json(data).unwrap();
        assert_eq!(result.total, 4);
        assert_eq!(result.imported, 2);
        assert_eq!(result.skipped, 2);
        assert!(result.errors[0].starts_with("Entry 2:"));
        assert!(result.errors[1].contains("liters_33 cannot be negative"));
    }

    #[test]
    fn test_import_json_not_an_array() {
        let store = Store::open_in_memory().unwrap();
        let err = store.import_json(r#"{"date": "2024-01-01"}"#).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
