//! Waste records API server
//!
//! Usage:
//!   cargo run --bin waste_records                 # start server on :3001
//!   cargo run --bin load_data                     # post sample items to it
//!   cargo run --bin waste-cli -- login -u admin -p password123
//!
//! Settings come from flags, environment variables or a `.env` file
//! (see `waste_records --help`).

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use waste_records::config::Config;
use waste_records::logging;
use waste_records::rest::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    let _log_guard = logging::init(config.log_format, config.log_dir.as_deref())?;

    let state = AppState::from_config(&config).context("hashing seed credentials")?;
    let item_count = state.items.len().await?;
    let app = create_router(state);

    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, items = item_count, "REM Waste Management API running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
