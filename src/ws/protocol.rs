//! WebSocket message formats.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    System { data: SystemData },
    Status { data: StatusData },
    Pong { data: PongData },
    CommandResult {
        command: String,
        success: bool,
        message: String,
    },
    Notification { data: Notification },
    Speak {
        text: String,
        emotion: String,
        display_time: u64,
    },
    Error { data: SystemData },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemData {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusData {
    pub server_status: &'static str,
    pub monitoring_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PongData {
    pub timestamp: Value,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub message: String,
    pub message_type: String,
    pub title: String,
    pub importance: String,
    pub timestamp: f64,
    pub skip_audio: bool,
}

impl Notification {
    pub fn new(message: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            message_type: message_type.into(),
            title: "Notice".to_string(),
            importance: "normal".to_string(),
            timestamp: unix_now(),
            skip_audio: false,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn importance(mut self, importance: impl Into<String>) -> Self {
        self.importance = importance.into();
        self
    }

    pub fn skip_audio(mut self, skip: bool) -> Self {
        self.skip_audio = skip;
        self
    }
}

impl ServerMessage {
    pub fn system(message: impl Into<String>) -> Self {
        ServerMessage::System {
            data: SystemData {
                message: message.into(),
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            data: SystemData {
                message: message.into(),
            },
        }
    }

    pub fn status(monitoring_active: bool) -> Self {
        ServerMessage::Status {
            data: StatusData {
                server_status: "running",
                monitoring_active,
            },
        }
    }

    pub fn pong(timestamp: Value) -> Self {
        ServerMessage::Pong {
            data: PongData { timestamp },
        }
    }

    pub fn command_result(command: &str, success: bool, message: impl Into<String>) -> Self {
        ServerMessage::CommandResult {
            command: command.to_string(),
            success,
            message: message.into(),
        }
    }

    pub fn speak(text: impl Into<String>, emotion: impl Into<String>) -> Self {
        ServerMessage::Speak {
            text: text.into(),
            emotion: emotion.into(),
            display_time: 5000,
        }
    }
}

/// Messages received from clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping {
        #[serde(default = "zero")]
        timestamp: Value,
    },
    Command {
        #[serde(default)]
        command: String,
    },
    #[serde(other)]
    Unknown,
}

fn zero() -> Value {
    Value::from(0)
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
