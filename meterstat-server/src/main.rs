// Meterstat Server - HTTP adapter for meterstat
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Meterstat Server
//!
//! Serves aggregated consumption series, trends and spike checks over HTTP,
//! backed by an in-memory series store.
//!
//! ## Usage
//!
//! ```bash
//! # Preload readings from a CSV file (entity,timestamp,value)
//! meterstat-server --csv readings.csv
//!
//! # Custom port, wider reference window, averaged buckets
//! meterstat-server --port 8080 --window 7 --mode mean
//! ```

mod api;
mod error;
mod metrics;
mod store;

use api::{router, AppState};
use clap::Parser;
use meterstat::{AggregationMode, AnalyticsConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use store::{load_csv, MemoryStore, SeriesStore};
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Meterstat analytics server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "9200")]
    port: u16,

    /// CSV file to preload (entity,timestamp,value)
    #[arg(short, long)]
    csv: Option<PathBuf>,

    /// JSON analytics configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reference window size for spike checks (overrides --config)
    #[arg(short, long)]
    window: Option<usize>,

    /// Bucket folding: sum or mean (overrides --config)
    #[arg(short, long)]
    mode: Option<AggregationMode>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn analytics_config(&self) -> Result<AnalyticsConfig, String> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
                AnalyticsConfig::from_json(&json).map_err(|e| e.to_string())?
            }
            None => AnalyticsConfig::default(),
        };
        if let Some(window) = self.window {
            config.anomaly.window_size = window;
        }
        if let Some(mode) = self.mode {
            config.aggregation = mode;
        }
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Meterstat Server v{}", env!("CARGO_PKG_VERSION"));

    let config = match args.analytics_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Aggregation: {:?}, spike window: {}, sigma: {}, direction: {:?}",
        config.aggregation,
        config.anomaly.window_size,
        config.anomaly.sigma_multiplier,
        config.anomaly.direction
    );

    let store = Arc::new(MemoryStore::new());

    if let Some(csv_path) = &args.csv {
        match load_csv(store.as_ref(), csv_path).await {
            Ok(summary) => {
                info!(
                    "Dataset loaded: {} series, {} samples",
                    summary.series, summary.samples
                );
                metrics::record_ingest(summary.samples);
                metrics::update_series_count(store.series().await.len());
            }
            Err(e) => warn!("Failed to load dataset: {}", e),
        }
    } else {
        info!("No dataset specified, starting with an empty store");
    }

    let state = Arc::new(AppState::new(store, config));
    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting server on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
