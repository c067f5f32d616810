//! Liveness and notification test endpoints.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::server::AppState;
use crate::ws::protocol::unix_now;
use crate::ws::Notification;

pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/health/test", post(health_test))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "server_time": unix_now(),
        "startup": state.startup.phase().as_str(),
        "monitoring_active": state.monitoring_active(),
        "connections": state.connections.len(),
    }))
}

#[derive(Debug, Deserialize)]
struct HealthTestParams {
    value: i64,
}

async fn health_test(
    State(state): State<AppState>,
    Query(params): Query<HealthTestParams>,
) -> Json<Value> {
    let (health, notification) = health_notification(params.value);
    let delivered = state.connections.notify(notification);
    tracing::info!(health, delivered, "Health test notification sent");

    Json(json!({
        "status": "success",
        "message": "Health test notification sent",
        "health_value": health,
    }))
}

/// Clamp `value` to 0..=100 and describe it.
pub fn health_notification(value: i64) -> (i64, Notification) {
    let health = value.clamp(0, 100);
    let notification = match health {
        0..=10 => Notification::new(format!("Danger! Health is critically low: {health}%"), "error")
            .title("Health critical")
            .importance("high"),
        11..=30 => Notification::new(format!("Careful, health is dropping: {health}%"), "warning")
            .title("Health warning")
            .importance("high"),
        31..=60 => Notification::new(format!("Health is moderate: {health}%"), "info")
            .title("Health"),
        _ => Notification::new(format!("Health is good: {health}%"), "success").title("Health"),
    };
    (health, notification)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_levels() {
        let (health, n) = health_notification(-20);
        assert_eq!(health, 0);
        assert_eq!(n.message_type, "error");

        assert_eq!(health_notification(30).1.message_type, "warning");
        assert_eq!(health_notification(31).1.message_type, "info");
        assert_eq!(health_notification(60).1.importance, "normal");

        let (health, n) = health_notification(250);
        assert_eq!(health, 100);
        assert_eq!(n.message_type, "success");
    }
}
