//! Voice endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::voice::{SynthesisRequest, VoiceError, VoiceService};
use crate::ws::ServerMessage;

pub fn voice_router() -> Router<AppState> {
    Router::new()
        .route("/api/voice/speaker", post(change_speaker))
        .route("/api/voice/synthesize", post(synthesize))
        .route("/api/voice/check-connection", get(check_connection))
        .route("/api/voice/speak", post(speak))
        .route("/api/voice/analyze", post(analyze))
}

fn voice_service(state: &AppState) -> Result<Arc<VoiceService>, ApiError> {
    state
        .voice
        .get()
        .ok_or_else(|| VoiceError::NotInitialized.into())
}

#[derive(Debug, Deserialize)]
struct SpeakerParams {
    #[serde(default = "default_speaker")]
    speaker_id: u32,
}

fn default_speaker() -> u32 {
    3
}

async fn change_speaker(
    State(state): State<AppState>,
    Query(params): Query<SpeakerParams>,
) -> Json<Value> {
    state
        .settings
        .update(|settings| settings.voicevox.speaker = params.speaker_id);
    tracing::info!(speaker_id = params.speaker_id, "Default speaker changed");

    Json(json!({
        "status": "success",
        "message": format!("Speaker changed (ID: {})", params.speaker_id),
        "speaker_id": params.speaker_id,
    }))
}

async fn synthesize(
    State(state): State<AppState>,
    Json(request): Json<SynthesisRequest>,
) -> Result<Response, ApiError> {
    let voice = voice_service(&state)?;
    let audio = voice.synthesize(&request).await?;
    Ok(([(header::CONTENT_TYPE, "audio/wav")], audio).into_response())
}

async fn check_connection(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let voice = voice_service(&state)?;
    let body = match voice.check_connection().await {
        Ok(version) => json!({ "connected": true, "version": version }),
        Err(e) => {
            tracing::warn!(error = %e, "Voice engine unreachable");
            json!({ "connected": false, "error": e.to_string() })
        }
    };
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
struct SpeakRequest {
    text: String,
    #[serde(default = "default_emotion")]
    emotion: String,
}

fn default_emotion() -> String {
    "normal".to_string()
}

/// Ask connected clients to speak a line.
async fn speak(
    State(state): State<AppState>,
    Json(request): Json<SpeakRequest>,
) -> Result<Json<Value>, ApiError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(VoiceError::EmptyText.into());
    }

    let voice = voice_service(&state)?;
    let cooldown = state.settings.load().voice.cooldown();
    if voice.is_duplicate("speak", text, cooldown) {
        return Ok(Json(json!({
            "status": "skipped",
            "message": "Duplicate message suppressed",
            "delivered": 0,
        })));
    }

    let delivered = state
        .connections
        .broadcast(ServerMessage::speak(text, request.emotion.as_str()));
    Ok(Json(json!({
        "status": "success",
        "message": "Speak request sent",
        "delivered": delivered,
    })))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    text: String,
    #[serde(default)]
    speaker: Option<u32>,
    #[serde(default)]
    force: bool,
}

/// Analyze a line's emotion, synthesize it with matching prosody and store
/// the audio under `/temp`.
async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<Value>, ApiError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(VoiceError::EmptyText.into());
    }

    let voice = voice_service(&state)?;
    let settings = state.settings.load();
    if !request.force && voice.is_duplicate("analyzed_voice", text, settings.voice.cooldown()) {
        return Ok(Json(json!({
            "status": "skipped",
            "message": "Duplicate message suppressed",
        })));
    }

    let (audio, analysis) = voice.synthesize_analyzed(text, request.speaker).await?;

    let name = format!("voice_{}.wav", Uuid::new_v4().simple());
    let path = std::path::Path::new(&settings.paths.temp_dir).join(&name);
    tokio::fs::write(&path, &audio).await.map_err(|e| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to store audio at {}: {e}", path.display()),
        )
    })?;
    tracing::debug!(path = %path.display(), emotion = analysis.emotion, "Stored analyzed speech");

    Ok(Json(json!({
        "status": "success",
        "message": "Synthesized with analyzed emotion",
        "file": format!("/temp/{name}"),
        "analysis": analysis,
    })))
}
