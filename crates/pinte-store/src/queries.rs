//! Query builder for consumption records.
//!
//! [`RecordQuery`] follows the builder pattern: every filter is optional and
//! methods chain in any order. Date bounds are inclusive and apply to the
//! calendar day of a record, not its time.
//!
//! # Example
//!
//! ```
//! use pinte_store::{RecordQuery, Store};
//! use time::macros::date;
//!
//! let store = Store::open_in_memory()?;
//!
//! // March, newest first, 50 per page
//! let query = RecordQuery::new()
//!     .since(date!(2024 - 03 - 01))
//!     .until(date!(2024 - 03 - 31))
//!     .limit(50)
//!     .offset(0);
//! let page = store.query_records(&query)?;
//!
//! // Everything, in chronological order
//! let all = store.query_records(&RecordQuery::new().oldest_first())?;
//! # Ok::<(), pinte_store::Error>(())
//! ```

use time::Date;

use pinte_types::format_date;

/// Fluent query builder for stored records.
///
/// By default, queries return results ordered by date and time descending
/// (newest first). Rows logged at the same instant are ordered by row id in
/// the same direction, so newest first lists the most recent insert first.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    /// Include only records on or after this day.
    pub since: Option<Date>,
    /// Include only records on or before this day.
    pub until: Option<Date>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Number of results to skip.
    pub offset: Option<u32>,
    /// Order newest first. Default: true.
    pub newest_first: bool,
}

impl RecordQuery {
    /// Create a new query with default settings.
    ///
    /// Default behavior:
    /// - No date range filter
    /// - No limit (all matching records)
    /// - Ordered by newest first
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// A query covering an inclusive date range, oldest first.
    pub fn range(start: Option<Date>, end: Option<Date>) -> Self {
        Self {
            since: start,
            until: end,
            newest_first: false,
            ..Default::default()
        }
    }

    /// Filter to records on or after this day.
    pub fn since(mut self, date: Date) -> Self {
        self.since = Some(date);
        self
    }

    /// Filter to records on or before this day.
    pub fn until(mut self, date: Date) -> Self {
        self.until = Some(date);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    ///
    /// Use with `limit()` for pagination: page 2 with 50 per page is
    /// `.limit(50).offset(50)`.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results chronologically.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    ///
    /// Dates are stored as `YYYY-MM-DD` text, which sorts chronologically.
    pub(crate) fn build_where(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(since) = self.since {
            conditions.push("date >= ?");
            params.push(format_date(since));
        }

        if let Some(until) = self.until {
            conditions.push("date <= ?");
            params.push(format_date(until));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT id, date, time, pints, half_pints, liters_33, created_at \
             FROM consumption {where_clause} ORDER BY date {order}, time {order}, id {order}"
        );

        // SQLite only accepts OFFSET after a LIMIT
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        sql
    }
}
