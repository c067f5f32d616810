//! Metrics collection and exposition.
//!
//! # Metrics
//! - `secretary_startup_total` (counter): sequencer runs by outcome
//! - `secretary_engine_ready_wait_seconds` (histogram): readiness poll duration
//! - `secretary_engine_ready` (gauge): 1 if the last poll saw the engine ready
//! - `secretary_ws_connections` (gauge): current WebSocket connections
//! - `secretary_synthesis_total` (counter): synthesis requests by result
//! - `secretary_synthesis_duration_seconds` (histogram): synthesis latency
//! - `secretary_alerts_total` (counter): monitoring alerts by level

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Install the global Prometheus recorder.
///
/// Must run before the startup sequence; anything recorded earlier is
/// dropped by the no-op recorder. The scrape endpoint is served separately
/// once the settings name its address.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Serve `GET /metrics` from `handle` until the listener fails.
pub async fn serve_metrics(handle: PrometheusHandle, listener: TcpListener) -> std::io::Result<()> {
    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(UPKEEP_INTERVAL);
        loop {
            ticker.tick().await;
            upkeep.run_upkeep();
        }
    });

    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );
    tracing::info!(address = %listener.local_addr()?, "Metrics exporter listening");
    axum::serve(listener, app).await
}

pub fn record_startup(outcome: &'static str) {
    ::metrics::counter!("secretary_startup_total", "outcome" => outcome).increment(1);
}

pub fn record_readiness_poll(ready: bool, attempts: u32, elapsed: Duration) {
    ::metrics::histogram!("secretary_engine_ready_wait_seconds").record(elapsed.as_secs_f64());
    ::metrics::gauge!("secretary_engine_ready").set(if ready { 1.0 } else { 0.0 });
    ::metrics::counter!("secretary_engine_ready_checks_total").increment(u64::from(attempts));
}

pub fn record_ws_connections(active: usize) {
    ::metrics::gauge!("secretary_ws_connections").set(active as f64);
}

pub fn record_synthesis(ok: bool, elapsed: Duration) {
    let result = if ok { "ok" } else { "error" };
    ::metrics::counter!("secretary_synthesis_total", "result" => result).increment(1);
    ::metrics::histogram!("secretary_synthesis_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_alert(level: &'static str) {
    ::metrics::counter!("secretary_alerts_total", "level" => level).increment(1);
}
