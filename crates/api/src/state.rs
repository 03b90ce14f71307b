use std::sync::Arc;

use mlsk_orchestrator::orchestrator::Orchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Owner of the engine pool and of the request registry.
    pub orchestrator: Arc<Orchestrator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
