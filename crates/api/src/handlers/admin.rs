//! Handlers for the admin endpoints.

use axum::extract::{Path, State};
use axum::Json;
use mlsk_core::models::admin::{BookedRequest, EngineDetail, EngineStatus};
use mlsk_core::types::EngineId;

use crate::error::AppResult;
use crate::services::admin;
use crate::state::AppState;

/// GET /admin/ping
///
/// Ping every engine; one detail per engine, in pool order.
pub async fn ping_all(State(state): State<AppState>) -> AppResult<Json<Vec<EngineDetail>>> {
    let details = admin::ping_all(state.orchestrator).await?;
    Ok(Json(details))
}

/// GET /admin/ping/{engine_id}
pub async fn ping(
    State(state): State<AppState>,
    Path(engine_id): Path<EngineId>,
) -> AppResult<Json<EngineDetail>> {
    let detail = admin::ping(state.orchestrator, engine_id).await?;
    Ok(Json(detail))
}

/// GET /admin/engines
pub async fn list_engines(State(state): State<AppState>) -> Json<Vec<EngineStatus>> {
    Json(admin::engines(&state.orchestrator))
}

/// GET /admin/requests
pub async fn list_requests(State(state): State<AppState>) -> Json<Vec<BookedRequest>> {
    Json(admin::requests(&state.orchestrator).await)
}
