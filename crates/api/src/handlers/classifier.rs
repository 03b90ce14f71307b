//! Handlers for the classifier endpoints, mounted once under
//! `/{classifier_type}`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mlsk_core::models::classifier::{
    ClassifierDataRequest, ClassifierRequest, ClassifierResponse, ClassifierStartResponse,
    ClassifierType,
};

use crate::error::{AppError, AppResult};
use crate::services::classifier::{self, ClassifierStart};
use crate::state::AppState;

/// POST /{classifier_type}/start
pub async fn start(
    State(state): State<AppState>,
    Path(classifier_type): Path<String>,
    Json(body): Json<ClassifierStart>,
) -> AppResult<Json<ClassifierStartResponse>> {
    let classifier_type = parse_classifier_type(&classifier_type)?;
    let started = classifier::start(state.orchestrator, classifier_type, body).await?;
    Ok(Json(started))
}

/// POST /{classifier_type}/data
pub async fn data(
    State(state): State<AppState>,
    Path(classifier_type): Path<String>,
    Json(body): Json<ClassifierDataRequest>,
) -> AppResult<StatusCode> {
    let classifier_type = parse_classifier_type(&classifier_type)?;
    classifier::data(state.orchestrator, classifier_type, body).await?;
    Ok(StatusCode::OK)
}

/// POST /{classifier_type}/predict
pub async fn predict(
    State(state): State<AppState>,
    Path(classifier_type): Path<String>,
    Json(body): Json<ClassifierRequest>,
) -> AppResult<Json<ClassifierResponse>> {
    let classifier_type = parse_classifier_type(&classifier_type)?;
    let prediction = classifier::predict(state.orchestrator, classifier_type, body.request_id).await?;
    Ok(Json(prediction))
}

/// POST /{classifier_type}/predict-accuracy
///
/// Responds with a bare JSON number.
pub async fn predict_accuracy(
    State(state): State<AppState>,
    Path(classifier_type): Path<String>,
    Json(body): Json<ClassifierRequest>,
) -> AppResult<Json<f64>> {
    let classifier_type = parse_classifier_type(&classifier_type)?;
    let accuracy =
        classifier::predict_accuracy(state.orchestrator, classifier_type, body.request_id).await?;
    Ok(Json(accuracy))
}

/// POST /{classifier_type}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(classifier_type): Path<String>,
    Json(body): Json<ClassifierRequest>,
) -> AppResult<StatusCode> {
    let classifier_type = parse_classifier_type(&classifier_type)?;
    classifier::cancel(state.orchestrator, classifier_type, body.request_id).await?;
    Ok(StatusCode::OK)
}

fn parse_classifier_type(segment: &str) -> AppResult<ClassifierType> {
    ClassifierType::from_path_segment(segment)
        .ok_or_else(|| AppError::NotFound(format!("Unknown classifier type '{segment}'")))
}
