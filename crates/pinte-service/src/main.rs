//! Pinte Service - HTTP API for the consumption tracker.
//!
//! Run with: `cargo run -p pinte-service`

use std::path::PathBuf;

use clap::Parser;
use time::UtcOffset;
use tracing::{info, warn};

use pinte_service::state::offset_clock;
use pinte_service::{AppState, Config, app, bind};
use pinte_store::Store;

/// Pinte Service - HTTP REST API for the consumption tracker.
#[derive(Parser, Debug)]
#[command(name = "pinte-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long)]
    database: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pinte_service=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Must be read before the runtime starts its worker threads
    let offset = UtcOffset::current_local_offset().unwrap_or_else(|_| {
        warn!("Could not determine local UTC offset, using UTC");
        UtcOffset::UTC
    });

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_server(args, offset))
}

async fn run_server(args: Args, offset: UtcOffset) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    // Override config with CLI args
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }
    config.validate()?;

    let store = Store::open(&config.storage.path)?;
    let state = AppState::with_clock(store, &config, offset_clock(offset));

    let listener = bind(&config).await?;
    info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
