//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (middleware: request ID, trace, CORS, timeout, body limit)
//!     → routes/ (health, voice, websocket, settings, /shutdown)
//!     → response.rs (errors as JSON)
//! ```

pub mod request;
pub mod response;
pub mod routes;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{AppState, HttpServer};
