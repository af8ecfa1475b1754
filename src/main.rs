//! Meltwatch - melting-furnace energy monitoring service
//!
//! Loads the archived furnace exports, replays the configured day as a live
//! stream and serves the dashboard API.
//!
//! # Usage
//!
//! ```bash
//! # Run with ./meltwatch.toml (or built-in defaults)
//! cargo run --release
//!
//! # Point at a data directory produced by telemetry-gen
//! cargo run --release -- --data ./demo-data
//! ```
//!
//! # Environment Variables
//!
//! - `MELTWATCH_CONFIG`: Path to the plant TOML config
//! - `MELTWATCH_SERVER_ADDR`: Listen address (default: 0.0.0.0:8080)
//! - `MELTWATCH_CORS_ORIGINS`: Comma-separated allowed origins
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use meltwatch::api::{create_app, DashboardState};
use meltwatch::config::{defaults, PlantConfig};
use meltwatch::telemetry::{self, TelemetryStore};
use meltwatch::{ForecastGenerator, LinearForecaster, StreamCursor, StreamHandle, ThresholdClassifier};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "meltwatch")]
#[command(about = "Melting furnace anomaly replay and energy forecasting service")]
#[command(version)]
struct CliArgs {
    /// Plant config file (overrides MELTWATCH_CONFIG and ./meltwatch.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Directory holding the CSV exports; configured file names are kept
    #[arg(long, value_name = "DIR")]
    data: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

// ============================================================================
// Startup
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PlantConfig> {
    match path {
        Some(p) => PlantConfig::load_from_file(p)
            .with_context(|| format!("Failed to load plant config {}", p.display())),
        None => Ok(PlantConfig::load()),
    }
}

/// Load every export and assemble the shared API state.
fn init_state(config: PlantConfig) -> Result<DashboardState> {
    let data = &config.data;

    let store = TelemetryStore::new(
        telemetry::load_minute_csv(&data.minute_csv).context("Failed to load minute telemetry")?,
    );
    let daily = telemetry::load_day_csv(&data.day_csv).context("Failed to load day-level data")?;
    let batches = match &data.batch_csv {
        Some(path) => telemetry::load_batch_csv(path).unwrap_or_else(|e| {
            warn!(error = %e, "Batch data unavailable; batch view will be empty");
            Vec::new()
        }),
        None => Vec::new(),
    };

    if let Some((first, last)) = store.span() {
        info!(records = store.len(), %first, %last, "Telemetry archive loaded");
    }

    let stream_cfg = &config.stream;
    let active = store.active_day(stream_cfg.active_date, stream_cfg.start_time).to_vec();
    info!(
        date = %stream_cfg.active_date,
        from = %stream_cfg.start_time,
        records = active.len(),
        "Active day selected for replay"
    );

    let classifier = ThresholdClassifier::new(config.classifier.clone());
    let cursor = StreamCursor::new(active, Box::new(classifier), stream_cfg.window_size);

    let model = LinearForecaster::new(config.forecaster.clone()).context("Invalid forecaster parameters")?;
    let generator = ForecastGenerator::new(Box::new(model));

    Ok(DashboardState::new(
        StreamHandle::new(cursor),
        store,
        daily,
        batches,
        generator,
        config,
    ))
}

/// Serve the API until `cancel_token` fires, letting in-flight requests drain.
async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    cancel_token: CancellationToken,
) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("HTTP server received shutdown signal");
        })
        .await
        .context("HTTP server error")?;
    info!("HTTP server graceful shutdown complete");
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let mut plant_config = load_config(args.config.as_ref())?;
    if let Some(dir) = &args.data {
        plant_config.data.rebase(dir);
    }
    info!(
        plant = %plant_config.plant.name,
        furnace = %plant_config.plant.furnace,
        "Meltwatch {}",
        env!("CARGO_PKG_VERSION")
    );

    let server_addr = args
        .addr
        .or_else(|| std::env::var(defaults::SERVER_ADDR_ENV_VAR).ok())
        .unwrap_or_else(|| plant_config.server.addr.clone());

    let state = init_state(plant_config)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind {server_addr}"))?;
    info!(addr = %server_addr, "Dashboard API listening");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    if let Err(e) = serve(listener, app, cancel_token).await {
        error!(error = %e, "Meltwatch stopped with error");
        return Err(e);
    }

    info!("Meltwatch stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serve_returns_after_cancel() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let token = CancellationToken::new();
        let server = tokio::spawn(serve(listener, Router::new(), token.clone()));

        token.cancel();
        server.await.unwrap().unwrap();
    }
}
