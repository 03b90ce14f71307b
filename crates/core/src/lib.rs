//! Shared domain types for the MLSK engine orchestration service.
//!
//! Everything here is free of I/O: engine endpoints and states, action
//! names used for logging and request bookkeeping, and the JSON models
//! exchanged with the computation engines.

pub mod actions;
pub mod endpoint;
pub mod engine_state;
pub mod error;
pub mod models;
pub mod types;
