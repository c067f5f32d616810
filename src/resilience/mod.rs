//! Resilience helpers.
//!
//! # Design Decisions
//! - Jittered backoff prevents probe storms against a starting engine
//! - Every external call carries its own timeout (see engine/client.rs)

pub mod backoff;
