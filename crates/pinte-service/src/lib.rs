//! HTTP REST API for the Pinte consumption tracker.
//!
//! This crate provides a service that:
//! - Records drinks into the local database
//! - Serves per-day, per-month and overall totals with overconsumption warnings
//! - Exports and imports the whole history as CSV or JSON
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/consumption?start_date=&end_date=` - Totals, warnings and records for a date range
//! - `POST /api/consumption` - Record a drink (`{date?, time?, pints?, half_pints?, liters_33?}`)
//! - `GET /api/warnings?start_date=&end_date=` - Currently active warnings
//! - `GET /api/export?format=csv|json` - Download the history
//! - `POST /api/import?format=csv|json` - Upload a history file
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/pinte/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//! # Reject a second append within this many milliseconds (0 disables)
//! append_cooldown_ms = 1000
//!
//! [storage]
//! path = "~/.local/share/pinte/data.db"
//! ```

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod middleware;
pub mod state;

pub use api::AppError;
pub use config::{Config, ConfigError, ServerConfig, StorageConfig, ValidationError};
pub use middleware::AppendGuard;
pub use state::{AppState, Clock};

/// Build the full application: API routes, append debouncing, request
/// tracing and permissive CORS.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::router())
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::append_guard,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind the configured server address. Host names such as `localhost` are
/// resolved by the listener.
pub async fn bind(config: &Config) -> std::io::Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind(config.server.bind.as_str()).await
}
