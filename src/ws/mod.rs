//! WebSocket subsystem.
//!
//! # Data Flow
//! ```text
//! Client connects (http/routes/websocket.rs)
//!     → manager.rs register → per-connection channel
//!     → writer task forwards channel → socket
//!
//! Any subsystem (monitoring, routes):
//!     → manager.rs broadcast / notify → every channel
//! ```

pub mod manager;
pub mod protocol;

pub use manager::ConnectionManager;
pub use protocol::{ClientMessage, Notification, ServerMessage};
