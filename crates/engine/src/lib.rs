//! Computation engine handles.
//!
//! An engine is an external process serving an HTTP API on a fixed port.
//! This crate launches and supervises those processes ([`process`]),
//! talks to their API ([`client`]), and wraps both behind a worker handle
//! with a small state machine ([`engine`]). Lifecycle changes are
//! broadcast as [`events::EngineEvent`]s.

pub mod client;
pub mod config;
pub mod engine;
pub mod events;
pub mod process;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
