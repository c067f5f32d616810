//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router from the four route groups
//! - Serve the static directories
//! - Wire up middleware (tracing, request ID, timeout, body limit, CORS)
//! - Serve until the shutdown signal fires

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{extract::State, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Settings, SettingsHandle};
use crate::http::request::{request_span, X_REQUEST_ID};
use crate::http::routes::{health_router, settings_router, voice_router, websocket_router};
use crate::lifecycle::{Shutdown, StartupState};
use crate::monitoring::{FeatureSettings, MonitoringControl};
use crate::voice::VoiceServiceCell;
use crate::ws::ConnectionManager;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: SettingsHandle,
    pub voice: Arc<VoiceServiceCell>,
    pub connections: ConnectionManager,
    pub features: Arc<FeatureSettings>,
    pub monitoring: Option<Arc<dyn MonitoringControl>>,
    pub startup: Arc<StartupState>,
    pub shutdown: Arc<Shutdown>,
}

impl AppState {
    pub fn monitoring_active(&self) -> bool {
        self.monitoring.as_ref().is_some_and(|m| m.is_active())
    }
}

/// HTTP server for the backend.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState, settings: &Settings) -> Self {
        Self {
            router: Self::build_router(state, settings),
        }
    }

    fn build_router(state: AppState, settings: &Settings) -> Router {
        let paths = &settings.paths;
        // Timeout and CORS need a `Default` response body, which the body
        // limit's wrapper lacks, so the limit sits outside them.
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(RequestBodyLimitLayer::new(settings.server.max_body_size))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(settings.server.request_timeout_secs),
            ))
            .layer(CorsLayer::permissive());

        Router::new()
            .merge(health_router())
            .merge(voice_router())
            .merge(websocket_router())
            .merge(settings_router())
            .route("/shutdown", post(shutdown))
            .nest_service("/static", ServeDir::new(&paths.static_dir))
            .nest_service("/temp", ServeDir::new(&paths.temp_dir))
            .nest_service("/shared", ServeDir::new(&paths.shared_dir))
            .with_state(state)
            .layer(middleware)
    }

    /// The assembled router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `signal` resolves.
    pub async fn run<F>(self, listener: TcpListener, signal: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown(State(state): State<AppState>) -> Json<Value> {
    tracing::info!("Shutdown requested over HTTP");
    state.shutdown.trigger();
    Json(json!({ "status": "success", "message": "Server is shutting down" }))
}
