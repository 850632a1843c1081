//! Local data persistence for Pinte consumption records.
//!
//! This crate provides SQLite-based storage for the drink log. Records are
//! append-only: every call to [`Store::append_record`] adds a row, even when
//! another row already has the same date and time.
//!
//! # Features
//!
//! - Append records and list them by inclusive date range
//! - Query with pagination and ordering via [`RecordQuery`]
//! - CSV and JSON export/import
//! - [`RecordStore`] trait for code that only needs to read and append
//!
//! # Example
//!
//! ```
//! use pinte_store::{RecordQuery, Store};
//! use pinte_types::ConsumptionRecord;
//! use time::macros::{date, time};
//!
//! let store = Store::open_in_memory()?;
//! store.append_record(&ConsumptionRecord::new(date!(2024 - 03 - 15), time!(20:00)).with_pints(2))?;
//!
//! let recent = store.query_records(&RecordQuery::new().limit(10))?;
//! assert_eq!(recent.len(), 1);
//! # Ok::<(), pinte_store::Error>(())
//! ```

mod error;
mod models;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use models::StoredRecord;
pub use queries::RecordQuery;
pub use store::{CSV_HEADER, ImportResult, RecordStore, Store};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/pinte/data.db`
/// - macOS: `~/Library/Application Support/pinte/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\pinte\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("pinte")
        .join("data.db")
}
