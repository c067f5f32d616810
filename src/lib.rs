//! Secretary backend library.

pub mod app;
pub mod config;
pub mod engine;
pub mod http;
pub mod lifecycle;
pub mod monitoring;
pub mod observability;
pub mod resilience;
pub mod voice;
pub mod ws;

pub use app::{App, AppOptions};
pub use config::schema::Settings;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, StartupSequencer};
