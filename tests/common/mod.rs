//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::extract::Query;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use secretary_backend::http::{AppState, HttpServer};
use secretary_backend::lifecycle::{Shutdown, ShutdownSequencer};
use secretary_backend::{App, AppOptions};

pub const FAKE_WAV: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

/// A stand-in VOICEVOX engine on an ephemeral port.
pub struct MockVoicevox {
    pub url: String,
    /// Queries received by `/synthesis`, with their speaker.
    pub synthesized: Arc<Mutex<Vec<(u32, Value)>>>,
}

#[derive(Deserialize)]
struct QueryParams {
    text: String,
    speaker: u32,
}

#[derive(Deserialize)]
struct SynthesisParams {
    speaker: u32,
}

pub async fn start_mock_voicevox() -> MockVoicevox {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let synthesized = Arc::new(Mutex::new(Vec::new()));
    let recorded = synthesized.clone();

    let app = Router::new()
        .route("/version", get(|| async { Json("0.14.7") }))
        .route(
            "/audio_query",
            post(|Query(params): Query<QueryParams>| async move {
                Json(json!({
                    "accent_phrases": [],
                    "speedScale": 1.0,
                    "pitchScale": 0.0,
                    "intonationScale": 1.0,
                    "volumeScale": 1.0,
                    "kana": params.text,
                    "speaker": params.speaker,
                }))
            }),
        )
        .route(
            "/synthesis",
            post(
                move |Query(params): Query<SynthesisParams>, Json(query): Json<Value>| {
                    let recorded = recorded.clone();
                    async move {
                        recorded.lock().unwrap().push((params.speaker, query));
                        ([(header::CONTENT_TYPE, "audio/wav")], FAKE_WAV).into_response()
                    }
                },
            ),
        );

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockVoicevox {
        url: format!("http://{}", addr),
        synthesized,
    }
}

/// A fully started backend serving on an ephemeral port.
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: ShutdownSequencer,
    pub server: JoinHandle<Result<(), std::io::Error>>,
    _dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

pub fn write_config(dir: &TempDir, engine_url: &str) -> PathBuf {
    let root = dir.path().display().to_string();
    let config = format!(
        r#"
[server]
bind_address = "127.0.0.1:0"
max_body_size = 65536

[voicevox]
host = "{engine_url}"
speaker = 1

[voice]
cooldown_secs = 2.0

[monitoring]
detector_command = ["sh", "-c", "echo 0"]
frame_interval_ms = 200

[paths]
static_dir = {static_dir:?}
logs_dir = {logs_dir:?}
temp_dir = {temp_dir:?}
shared_dir = {shared_dir:?}
"#,
        static_dir = format!("{root}/static"),
        logs_dir = format!("{root}/logs"),
        temp_dir = format!("{root}/temp"),
        shared_dir = format!("{root}/shared"),
    );

    let path = dir.path().join("settings.toml");
    std::fs::write(&path, config).unwrap();
    path
}

pub async fn spawn_app(engine_url: &str, enable_monitoring: bool) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, engine_url);

    let app = App::compose(AppOptions {
        config_path: Some(config_path),
        enable_monitoring,
    });
    app.startup.run().await.expect("startup failed");

    let settings = app.state.settings.load();
    let listener = TcpListener::bind(&settings.server.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(app.state.clone(), &settings);
    let stop = Shutdown::wait(app.state.shutdown.subscribe());
    let handle = tokio::spawn(server.run(listener, stop));

    TestApp {
        addr,
        state: app.state,
        shutdown: app.shutdown,
        server: handle,
        _dir: dir,
    }
}

pub type WsClient =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub async fn connect_ws(app: &TestApp) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(app.ws_url()).await.unwrap();
    ws
}

/// Next JSON text frame, failing after five seconds.
pub async fn next_json(ws: &mut WsClient) -> Value {
    use futures_util::StreamExt;

    loop {
        let frame = tokio::time::timeout(std::time::Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for WebSocket message")
            .expect("WebSocket closed")
            .unwrap();
        if frame.is_text() {
            return serde_json::from_str(frame.to_text().unwrap()).unwrap();
        }
    }
}

pub async fn send_json(ws: &mut WsClient, value: Value) {
    use futures_util::SinkExt;

    ws.send(tokio_tungstenite::tungstenite::Message::text(value.to_string()))
        .await
        .unwrap();
}

/// Connect and consume the greeting and initial status.
pub async fn connect_ws_ready(app: &TestApp) -> (WsClient, Value) {
    let mut ws = connect_ws(app).await;
    let greeting = next_json(&mut ws).await;
    assert_eq!(greeting["type"], "system");
    let status = next_json(&mut ws).await;
    assert_eq!(status["type"], "status");
    (ws, status)
}
