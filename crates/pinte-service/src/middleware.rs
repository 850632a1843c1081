//! Append debouncing for the pinte-service API.
//!
//! A double-tap on the client's "log a drink" button must not create two
//! records. [`AppendGuard`] remembers when the last append was accepted and
//! [`append_guard`] rejects any `POST /api/consumption` arriving within the
//! configured cooldown with `429 Too Many Requests`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json,
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::state::AppState;

/// Path guarded by [`append_guard`].
pub const APPEND_PATH: &str = "/api/consumption";

/// Tracks the last accepted append.
#[derive(Debug)]
pub struct AppendGuard {
    cooldown: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

/// A slot taken by [`AppendGuard::try_acquire`].
#[derive(Debug, Clone, Copy)]
pub struct Reservation {
    taken_at: Instant,
    previous: Option<Instant>,
}

impl AppendGuard {
    /// Create a guard. A zero cooldown disables it.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: Mutex::new(None),
        }
    }

    /// Configured cooldown.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Take the append slot, or return how long the caller must wait.
    pub async fn try_acquire(&self) -> Result<Reservation, Duration> {
        self.try_acquire_at(Instant::now()).await
    }

    async fn try_acquire_at(&self, now: Instant) -> Result<Reservation, Duration> {
        let mut last = self.last_accepted.lock().await;

        if !self.cooldown.is_zero()
            && let Some(previous) = *last
        {
            let elapsed = now.saturating_duration_since(previous);
            if elapsed < self.cooldown {
                return Err(self.cooldown - elapsed);
            }
        }

        let reservation = Reservation {
            taken_at: now,
            previous: *last,
        };
        *last = Some(now);
        Ok(reservation)
    }

    /// Give the slot back after the append was not accepted.
    ///
    /// Has no effect if another append has been accepted since.
    pub async fn release(&self, reservation: Reservation) {
        let mut last = self.last_accepted.lock().await;
        if *last == Some(reservation.taken_at) {
            *last = reservation.previous;
        }
    }
}

/// Debounce middleware for appends.
///
/// Only `POST /api/consumption` is guarded. A request that ends in an error
/// response releases its slot so that a corrected retry is not delayed.
pub async fn append_guard(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::POST || request.uri().path() != APPEND_PATH {
        return next.run(request).await;
    }

    match state.append_guard.try_acquire().await {
        Ok(reservation) => {
            let response = next.run(request).await;
            if !response.status().is_success() {
                state.append_guard.release(reservation).await;
            }
            response
        }
        Err(wait) => {
            // Retry-After has whole-second resolution
            let retry_after = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            warn!("Append rejected, retry in {} ms", wait.as_millis());
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_after.to_string())],
                Json(serde_json::json!({
                    "error": "Too many requests: an entry was just recorded",
                    "kind": "rate_limited",
                    "retry_after": retry_after
                })),
            )
                .into_response()
        }
    }
}
