//! Secretary backend.
//!
//! Serves the desktop secretary's HTTP and WebSocket API, drives the VOICEVOX
//! speech engine and, when enabled, runs zombie monitoring.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌───────────────────────────────────────────────────────┐
//!                  │                  SECRETARY BACKEND                     │
//!                  │                                                        │
//!   HTTP / WS      │  ┌─────────┐    ┌──────────────┐    ┌──────────────┐  │
//!   ───────────────┼─▶│  http   │───▶│    routes    │───▶│    voice     │──┼──▶ VOICEVOX
//!                  │  │ server  │    │ health/voice │    │   service    │  │    engine
//!                  │  └─────────┘    │ ws/settings  │    └──────────────┘  │
//!                  │                 └──────┬───────┘                       │
//!                  │                        ▼                               │
//!   notifications  │                 ┌──────────────┐    ┌──────────────┐  │
//!   ◀──────────────┼─────────────────│  ws manager  │◀───│  monitoring  │◀─┼─── detector
//!                  │                 └──────────────┘    └──────────────┘  │
//!                  │                                                        │
//!                  │  lifecycle: startup (settings → engine → voice →       │
//!                  │  readiness wait → monitoring), shutdown, signals       │
//!                  └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use secretary_backend::app::{App, AppOptions};
use secretary_backend::http::HttpServer;
use secretary_backend::lifecycle::{signals, Shutdown};
use secretary_backend::observability::logging::{init_logging, LogFormat};
use secretary_backend::observability::metrics;

#[derive(Parser)]
#[command(name = "secretary-backend")]
#[command(about = "Backend for the desktop secretary", long_about = None)]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start zombie monitoring after startup
    #[arg(long, alias = "zombie-detection")]
    enable_monitoring: bool,

    /// Verbose logging
    #[arg(long)]
    debug: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let debug = args.debug
        || std::env::var("DEBUG_MODE").is_ok_and(|v| v.eq_ignore_ascii_case("true"));
    init_logging(debug, args.log_format)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        monitoring = args.enable_monitoring,
        "secretary-backend starting"
    );

    // Installed before startup so the sequencer's series are kept.
    let metrics_handle = match metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics recorder");
            None
        }
    };

    let app = App::compose(AppOptions {
        config_path: args.config,
        enable_monitoring: args.enable_monitoring,
    });
    app.startup.run().await?;

    let settings = app.state.settings.load();
    if let Some(handle) = metrics_handle.filter(|_| settings.observability.metrics_enabled) {
        match TcpListener::bind(&settings.observability.metrics_address).await {
            Ok(listener) => {
                tokio::spawn(async move {
                    if let Err(e) = metrics::serve_metrics(handle, listener).await {
                        tracing::error!(error = %e, "Metrics exporter stopped");
                    }
                });
            }
            Err(e) => tracing::error!(
                error = %e,
                metrics_address = %settings.observability.metrics_address,
                "Failed to bind metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&settings.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let stop = Shutdown::wait(app.state.shutdown.subscribe());
    signals::spawn_signal_forwarder(app.state.shutdown.clone());

    let server = HttpServer::new(app.state.clone(), &settings);
    server.run(listener, stop).await?;

    app.shutdown.run().await;
    Ok(())
}
