//! WebSocket endpoint.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::http::server::AppState;
use crate::monitoring::MonitorStart;
use crate::ws::{ClientMessage, Notification, ServerMessage};

pub fn websocket_router() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (id, mut outbound) = state.connections.register();
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode WebSocket message");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    state
        .connections
        .send_to(id, ServerMessage::system("WebSocket connection established"));
    state
        .connections
        .send_to(id, ServerMessage::status(state.monitoring_active()));

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_text(&state, id, text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(connection_id = %id, error = %e, "WebSocket receive failed");
                break;
            }
        }
    }

    state.connections.unregister(id);
    let _ = writer.await;
}

async fn handle_text(state: &AppState, id: Uuid, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(connection_id = %id, error = %e, "Malformed WebSocket message");
            state
                .connections
                .send_to(id, ServerMessage::error("Invalid message format"));
            return;
        }
    };

    match message {
        ClientMessage::Ping { timestamp } => {
            state.connections.send_to(id, ServerMessage::pong(timestamp));
        }
        ClientMessage::Command { command } => handle_command(state, id, &command).await,
        ClientMessage::Unknown => {
            tracing::debug!(connection_id = %id, "Ignoring unknown message type");
        }
    }
}

async fn handle_command(state: &AppState, id: Uuid, command: &str) {
    match command {
        "status" => {
            state
                .connections
                .send_to(id, ServerMessage::status(state.monitoring_active()));
        }
        "start_monitoring" => start_monitoring(state, id).await,
        "stop_monitoring" => stop_monitoring(state, id).await,
        other => {
            tracing::debug!(command = other, "Unknown WebSocket command");
            state
                .connections
                .send_to(id, ServerMessage::command_result(other, false, "Unknown command"));
        }
    }
}

/// Send the command result followed by fresh status.
fn reply(state: &AppState, id: Uuid, command: &str, success: bool, message: impl Into<String>) {
    let connections = &state.connections;
    connections.send_to(id, ServerMessage::command_result(command, success, message));
    connections.send_to(id, ServerMessage::status(state.monitoring_active()));
}

async fn start_monitoring(state: &AppState, id: Uuid) {
    const COMMAND: &str = "start_monitoring";
    let Some(monitoring) = &state.monitoring else {
        reply(state, id, COMMAND, false, "Monitoring is not enabled");
        return;
    };

    match monitoring.start_monitoring().await {
        Ok(MonitorStart::Started) => {
            reply(state, id, COMMAND, true, "Monitoring started");
            state.connections.notify(
                Notification::new("Zombie monitoring has started.", "system").title("Monitoring"),
            );
            state.connections.broadcast(ServerMessage::speak(
                "Monitoring started. I will tell you if I spot anything.",
                "happy",
            ));
        }
        Ok(MonitorStart::AlreadyRunning) => {
            reply(state, id, COMMAND, true, "Monitoring is already running");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to start monitoring");
            reply(state, id, COMMAND, false, format!("Error: {e}"));
        }
    }
}

async fn stop_monitoring(state: &AppState, id: Uuid) {
    const COMMAND: &str = "stop_monitoring";
    let Some(monitoring) = &state.monitoring else {
        reply(state, id, COMMAND, false, "Monitoring is not enabled");
        return;
    };

    match monitoring.stop_monitoring().await {
        Ok(()) => {
            reply(state, id, COMMAND, true, "Monitoring stopped");
            state.connections.notify(
                Notification::new("Zombie monitoring has stopped.", "system").title("Monitoring"),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to stop monitoring");
            reply(state, id, COMMAND, false, format!("Error: {e}"));
        }
    }
}
