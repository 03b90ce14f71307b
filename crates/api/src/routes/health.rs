use axum::extract::State;
use axum::{routing::get, Json, Router};
use mlsk_core::engine_state::EngineState;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` while at least one engine is up, `degraded` otherwise.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Engines with a live process.
    pub engines_up: usize,
    pub engines_total: usize,
}

/// GET /health -- returns service and engine pool health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engines = state.orchestrator.engines();
    let engines_up = engines
        .iter()
        .filter(|engine| engine.state() != EngineState::Off)
        .count();

    let status = if engines_up > 0 { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        engines_up,
        engines_total: engines.len(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
