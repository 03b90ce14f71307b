//! Classifier workflows.
//!
//! `start` books an engine under a fresh request id and keeps it booked;
//! `data` runs on the booked engine; `predict`, `predict_accuracy` and
//! `cancel` run on it one last time and release it, whatever the outcome.

use std::future::Future;
use std::sync::Arc;

use mlsk_core::models::classifier::{
    ClassifierCancelRequest, ClassifierDataRequest, ClassifierRequest, ClassifierResponse,
    ClassifierStartRequest, ClassifierStartResponse, ClassifierType,
};
use mlsk_core::types::RequestId;
use mlsk_engine::engine::{Engine, EngineError};
use mlsk_orchestrator::orchestrator::Orchestrator;
use serde::Deserialize;

use super::detached;
use crate::error::AppResult;

/// What a classifier run is started with. The request id is assigned
/// here, not by the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierStart {
    pub prediction_column_name: String,
    pub action_column_names: Vec<String>,
    pub number_of_values: usize,
}

pub async fn start(
    orchestrator: Arc<Orchestrator>,
    classifier_type: ClassifierType,
    params: ClassifierStart,
) -> AppResult<ClassifierStartResponse> {
    let request_id = orchestrator.next_request_id();
    let action = classifier_type.start_action();
    tracing::info!(request_id, action, "[Start] Classifier start");

    let result = detached(async move {
        orchestrator.book_engine(request_id, action).await?;

        let request = ClassifierStartRequest {
            request_id,
            prediction_column_name: params.prediction_column_name,
            action_column_names: params.action_column_names,
            number_of_values: params.number_of_values,
            classifier_type,
        };
        let started = orchestrator
            .run_on_booked_engine(request_id, action, move |engine| async move {
                engine.start_classifier(&request).await
            })
            .await;

        if let Err(e) = started {
            orchestrator.complete_request(request_id, action).await;
            return Err(e.into());
        }
        Ok(ClassifierStartResponse { request_id })
    })
    .await;

    log_end(request_id, action, &result);
    result
}

pub async fn data(
    orchestrator: Arc<Orchestrator>,
    classifier_type: ClassifierType,
    request: ClassifierDataRequest,
) -> AppResult<()> {
    let request_id = request.request_id;
    let action = classifier_type.data_action();
    tracing::info!(request_id, action, column = %request.column_name, values = request.values.len(), "[Start] Classifier data");

    let result = detached(async move {
        Ok(orchestrator
            .run_on_booked_engine(request_id, action, move |engine| async move {
                engine.classifier_data(&request).await
            })
            .await?)
    })
    .await;

    log_end(request_id, action, &result);
    result
}

pub async fn predict(
    orchestrator: Arc<Orchestrator>,
    classifier_type: ClassifierType,
    request_id: RequestId,
) -> AppResult<ClassifierResponse> {
    run_and_complete(
        orchestrator,
        request_id,
        classifier_type.predict_action(),
        move |engine| async move {
            engine
                .classifier_predict(&ClassifierRequest { request_id })
                .await
        },
    )
    .await
}

pub async fn predict_accuracy(
    orchestrator: Arc<Orchestrator>,
    classifier_type: ClassifierType,
    request_id: RequestId,
) -> AppResult<f64> {
    run_and_complete(
        orchestrator,
        request_id,
        classifier_type.predict_accuracy_action(),
        move |engine| async move {
            engine
                .classifier_predict_accuracy(&ClassifierRequest { request_id })
                .await
        },
    )
    .await
}

pub async fn cancel(
    orchestrator: Arc<Orchestrator>,
    classifier_type: ClassifierType,
    request_id: RequestId,
) -> AppResult<()> {
    run_and_complete(
        orchestrator,
        request_id,
        classifier_type.cancel_action(),
        move |engine| async move {
            engine
                .cancel_classifier(&ClassifierCancelRequest {
                    request_id,
                    classifier_type,
                })
                .await
        },
    )
    .await
}

// ---- private helpers ----

/// Last call of a run: execute on the booked engine, then complete the
/// request even if the call failed.
async fn run_and_complete<T, F, Fut>(
    orchestrator: Arc<Orchestrator>,
    request_id: RequestId,
    action: &'static str,
    call: F,
) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(Arc<Engine>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, EngineError>> + Send + 'static,
{
    tracing::info!(request_id, action, "[Start] Classifier call");

    let result = detached(async move {
        let result = orchestrator
            .run_on_booked_engine(request_id, action, call)
            .await;
        orchestrator.complete_request(request_id, action).await;
        Ok(result?)
    })
    .await;

    log_end(request_id, action, &result);
    result
}

fn log_end<T>(request_id: RequestId, action: &'static str, result: &AppResult<T>) {
    match result {
        Ok(_) => tracing::info!(request_id, action, "[End] Classifier call"),
        Err(e) => tracing::error!(request_id, action, error = %e, "[End] Classifier call failed"),
    }
}
