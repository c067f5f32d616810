//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load settings → start engine → voice service      (fatal)
//!     → readiness.rs wait on engine → start monitoring  (best-effort)
//!
//! Shutdown (shutdown.rs):
//!     Signal or /shutdown → stop serving → stop monitoring
//!     → close WebSocket clients → stop engine
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```

pub mod readiness;
pub mod shutdown;
pub mod signals;
pub mod startup;

#[cfg(test)]
pub(crate) mod testing;

pub use readiness::{wait_until_ready, PollOutcome, ReadinessPolicy};
pub use shutdown::{Shutdown, ShutdownSequencer};
pub use startup::{StartupError, StartupOutcome, StartupPhase, StartupSequencer, StartupState};
