//! Route groups merged by the server.

pub mod health;
pub mod settings;
pub mod voice;
pub mod websocket;

pub use health::health_router;
pub use settings::settings_router;
pub use voice::voice_router;
pub use websocket::websocket_router;
