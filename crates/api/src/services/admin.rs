//! Admin operations. Pings go straight to the engines, busy or not.

use std::sync::Arc;

use mlsk_core::actions::ADMIN_PING;
use mlsk_core::models::admin::{BookedRequest, EngineDetail, EngineStatus};
use mlsk_core::types::EngineId;
use mlsk_orchestrator::orchestrator::Orchestrator;

use crate::error::AppResult;

pub async fn ping(orchestrator: Arc<Orchestrator>, engine_id: EngineId) -> AppResult<EngineDetail> {
    tracing::info!(engine_id, "[Start] Admin ping");
    let detail = orchestrator
        .priority_run_on_engine(engine_id, ADMIN_PING, |engine| async move { engine.ping().await })
        .await?;
    tracing::info!(engine_id, "[End] Admin ping");
    Ok(detail)
}

pub async fn ping_all(orchestrator: Arc<Orchestrator>) -> AppResult<Vec<EngineDetail>> {
    tracing::info!("[Start] Admin ping on all engines");
    let details = orchestrator
        .priority_run_on_all_engines(ADMIN_PING, |engine| async move { engine.ping().await })
        .await?;
    tracing::info!(engines = details.len(), "[End] Admin ping on all engines");
    Ok(details)
}

pub fn engines(orchestrator: &Orchestrator) -> Vec<EngineStatus> {
    orchestrator.engine_statuses()
}

pub async fn requests(orchestrator: &Orchestrator) -> Vec<BookedRequest> {
    orchestrator.booked_requests().await
}
