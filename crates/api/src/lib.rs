//! MLSK service HTTP layer.
//!
//! Exposes the building blocks (config, state, error handling, services,
//! routes) so integration tests and the `mlsk-service` binary share them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod services;
pub mod state;
