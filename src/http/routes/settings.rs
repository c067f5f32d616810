//! Feature settings endpoints.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::response::ApiError;
use crate::http::server::AppState;

pub fn settings_router() -> Router<AppState> {
    Router::new()
        .route("/api/settings/update", post(update_setting))
        .route("/api/settings/all", get(all_settings))
}

#[derive(Debug, Deserialize)]
struct SettingUpdate {
    key: String,
    value: Value,
}

async fn update_setting(
    State(state): State<AppState>,
    Json(update): Json<SettingUpdate>,
) -> Result<Json<Value>, ApiError> {
    let value = state.features.update(&update.key, &update.value)?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Setting updated: {}", update.key),
        "data": {
            "key": update.key,
            "value": value,
            "all_settings": state.features.get_all(),
        },
    })))
}

async fn all_settings(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Settings retrieved",
        "data": { "settings": state.features.get_all() },
    }))
}
