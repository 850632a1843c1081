//! REST API endpoints for the pinte-service.
//!
//! # Lock Acquisition
//!
//! `state.store` is a mutex held only while records are read or written.
//! Aggregation and warning detection run after it has been released.
//!
//! # Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]:
//! `{"error": "...", "kind": "..."}`. Invalid input is a 400 with kind
//! `validation` or `bad_request`; a failing store is a 500 with kind `store`,
//! so a client can tell a rejected entry apart from one that was lost.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::{info, warn};

use pinte_core::{ConsumptionReport, WarningView, active_warnings, detect_warnings};
use pinte_store::{ImportResult, RecordQuery, RecordStore};
use pinte_types::{ConsumptionRecord, RawRecord, RecordError, format_date, format_time, parse_date};

use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/consumption",
            get(get_consumption).post(append_consumption),
        )
        .route("/api/warnings", get(get_warnings))
        .route("/api/export", get(export))
        .route("/api/import", post(import))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Inclusive date range query parameters (`YYYY-MM-DD`).
#[derive(Debug, Deserialize, Default)]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RangeQuery {
    /// Parse both bounds and check that they are ordered.
    pub fn parse(&self) -> Result<(Option<Date>, Option<Date>), AppError> {
        let start = parse_bound("start_date", self.start_date.as_deref())?;
        let end = parse_bound("end_date", self.end_date.as_deref())?;

        if let (Some(start), Some(end)) = (start, end)
            && start > end
        {
            return Err(AppError::BadRequest(format!(
                "Invalid date range: 'start_date' ({}) must be on or before 'end_date' ({})",
                format_date(start),
                format_date(end)
            )));
        }

        Ok((start, end))
    }
}

fn parse_bound(name: &str, value: Option<&str>) -> Result<Option<Date>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .map_err(|e| AppError::BadRequest(format!("{name}: {e}"))),
    }
}

/// Read records from any [`RecordStore`].
fn fetch_records<S: RecordStore>(
    store: &S,
    start: Option<Date>,
    end: Option<Date>,
) -> Result<Vec<ConsumptionRecord>, AppError> {
    Ok(store.list_records(start, end)?)
}

/// Append to any [`RecordStore`].
fn store_record<S: RecordStore>(store: &S, record: &ConsumptionRecord) -> Result<i64, AppError> {
    Ok(store.append_record(record)?)
}

async fn load_range(
    state: &AppState,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Vec<ConsumptionRecord>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (start, end) = query.parse()?;

    let store = state.store.lock().await;
    fetch_records(&*store, start, end)
}

/// Full report for a date range.
///
/// # Query Parameters
///
/// - `start_date`: first day included (optional)
/// - `end_date`: last day included (optional)
///
/// # Errors
///
/// - Returns [`AppError::BadRequest`] if a date is malformed or `start_date > end_date`
/// - Returns [`AppError::Store`] if the database query fails
async fn get_consumption(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<ConsumptionReport>, AppError> {
    let records = load_range(&state, query).await?;
    Ok(Json(ConsumptionReport::build(&records, state.now())))
}

/// Active warnings for a date range.
async fn get_warnings(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<Vec<WarningView>>, AppError> {
    let records = load_range(&state, query).await?;
    let now = state.now();

    let episodes = detect_warnings(&records);
    let active = active_warnings(&episodes, now)
        .map(|episode| WarningView::new(episode.clone(), now))
        .collect();

    Ok(Json(active))
}

/// Body of `POST /api/consumption`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppendRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    pub pints: Option<i64>,
    pub half_pints: Option<i64>,
    pub liters_33: Option<i64>,
}

impl AppendRequest {
    /// Validate into a record, filling a missing date or time from `now`.
    pub fn into_record(self, now: PrimitiveDateTime) -> Result<ConsumptionRecord, AppError> {
        let raw = RawRecord {
            date: self.date.unwrap_or_else(|| format_date(now.date())),
            time: Some(self.time.unwrap_or_else(|| format_time(now.time()))),
            pints: self.pints.unwrap_or(0),
            half_pints: self.half_pints.unwrap_or(0),
            liters_33: self.liters_33.unwrap_or(0),
        };

        let record = raw.validate()?;
        if record.is_empty() {
            return Err(AppError::Validation("nothing to record".to_string()));
        }
        Ok(record)
    }
}

/// Response to a successful append.
#[derive(Debug, Serialize)]
pub struct AppendResponse {
    pub success: bool,
    pub id: i64,
    pub record: ConsumptionRecord,
}

/// Append a new record.
///
/// # Errors
///
/// - Returns [`AppError::BadRequest`] if the body is not valid JSON
/// - Returns [`AppError::Validation`] for negative or malformed values and for an empty entry
/// - Returns [`AppError::Store`] if the record could not be written
async fn append_consumption(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AppendRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AppendResponse>), AppError> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let record = request.into_record(state.now())?;

    let id = {
        let store = state.store.lock().await;
        store_record(&*store, &record)?
    };

    info!("Recorded entry {}: {}", id, record);
    Ok((
        StatusCode::CREATED,
        Json(AppendResponse {
            success: true,
            id,
            record,
        }),
    ))
}

/// Export/import file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    #[default]
    Json,
}

impl FileFormat {
    fn content_type(self) -> &'static str {
        match self {
            FileFormat::Csv => "text/csv; charset=utf-8",
            FileFormat::Json => "application/json",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }
}

/// `?format=csv|json`, JSON when absent.
#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    #[serde(default)]
    pub format: FileFormat,
}

/// Download the whole history.
async fn export(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FormatQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(FormatQuery { format }) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let all = RecordQuery::new().oldest_first();

    let content = {
        let store = state.store.lock().await;
        match format {
            FileFormat::Csv => store.export_csv(&all)?,
            FileFormat::Json => store.export_json(&all)?,
        }
    };

    let disposition = format!(
        "attachment; filename=\"pinte-export.{}\"",
        format.extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

/// Append every valid row of an uploaded file.
async fn import(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FormatQuery>, QueryRejection>,
    body: String,
) -> Result<Json<ImportResult>, AppError> {
    let Query(FormatQuery { format }) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let result = {
        let store = state.store.lock().await;
        match format {
            FileFormat::Csv => store.import_csv(&body),
            FileFormat::Json => store.import_json(&body),
        }
    };

    match result {
        Ok(result) => Ok(Json(result)),
        // Unparseable JSON documents are the client's fault
        Err(pinte_store::Error::Serialization(e)) => {
            Err(AppError::BadRequest(format!("Invalid JSON: {e}")))
        }
        Err(e) => Err(e.into()),
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    BadRequest(String),
    Store(pinte_store::Error),
}

impl AppError {
    /// Machine-readable error category.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::BadRequest(_) => "bad_request",
            AppError::Store(_) => "store",
        }
    }
}

impl From<pinte_store::Error> for AppError {
    fn from(e: pinte_store::Error) -> Self {
        AppError::Store(e)
    }
}

impl From<RecordError> for AppError {
    fn from(e: RecordError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Store(e) => {
                warn!("Store failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
            "kind": kind,
        });

        (status, Json(body)).into_response()
    }
}
