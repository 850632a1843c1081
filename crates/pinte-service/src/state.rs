//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use pinte_store::Store;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::middleware::AppendGuard;

/// Source of the current local date and time.
pub type Clock = Arc<dyn Fn() -> PrimitiveDateTime + Send + Sync>;

/// Shared application state.
pub struct AppState {
    /// The record store. Held only for the duration of a query or append.
    pub store: Mutex<Store>,
    /// Debounces appends.
    pub append_guard: AppendGuard,
    clock: Clock,
}

impl AppState {
    /// Create new application state using the system's local time.
    pub fn new(store: Store, config: &Config) -> Arc<Self> {
        Self::with_clock(store, config, Arc::new(local_now))
    }

    /// Create application state with an explicit clock.
    pub fn with_clock(store: Store, config: &Config, clock: Clock) -> Arc<Self> {
        let cooldown = Duration::from_millis(config.server.append_cooldown_ms);
        Arc::new(Self {
            store: Mutex::new(store),
            append_guard: AppendGuard::new(cooldown),
            clock,
        })
    }

    /// Current local date and time.
    pub fn now(&self) -> PrimitiveDateTime {
        (self.clock)()
    }
}

/// Wall-clock local time, falling back to UTC when the offset is unknown.
///
/// The local offset can usually only be read while the process is single
/// threaded; a multi-threaded server should use [`offset_clock`] instead.
pub fn local_now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
}

/// Clock reporting wall-clock time at a fixed UTC offset.
pub fn offset_clock(offset: UtcOffset) -> Clock {
    Arc::new(move || {
        let now = OffsetDateTime::now_utc().to_offset(offset);
        PrimitiveDateTime::new(now.date(), now.time())
    })
}
