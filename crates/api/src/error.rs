use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mlsk_core::error::CoreError;
use mlsk_engine::engine::EngineError;
use mlsk_orchestrator::error::OrchestratorError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors of the library crates and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A validation error from `mlsk_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A placement, binding or engine call failure.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An unknown resource (classifier type, engine id).
    #[error("Not found: {0}")]
    NotFound(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }

            // --- Orchestration errors ---
            AppError::Orchestrator(err) => classify_orchestrator_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify an orchestrator error into an HTTP status, error code, and message.
///
/// - No idle engine maps to 503; the caller may retry later.
/// - A lost or missing request binding maps to 500.
/// - A failed engine call maps to 502 with the engine's message.
/// - An unknown engine id maps to 404.
fn classify_orchestrator_error(err: &OrchestratorError) -> (StatusCode, &'static str, String) {
    match err {
        OrchestratorError::NoAvailableEngine(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "NO_AVAILABLE_ENGINE",
            err.to_string(),
        ),
        OrchestratorError::NoBookedEngine { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "NO_BOOKED_ENGINE",
            err.to_string(),
        ),
        OrchestratorError::NoEngineWithId { .. } => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
        }
        OrchestratorError::DuplicateRequest(_) => {
            (StatusCode::CONFLICT, "CONFLICT", err.to_string())
        }
        OrchestratorError::Engine(EngineError::EngineOff(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "ENGINE_OFF",
            err.to_string(),
        ),
        OrchestratorError::Engine(EngineError::Request(_)) => {
            tracing::warn!(error = %err, "Engine call failed");
            (StatusCode::BAD_GATEWAY, "ENGINE_ERROR", err.to_string())
        }
        OrchestratorError::NoEngineWithEndpoint { .. } | OrchestratorError::EngineCreation(_) => {
            tracing::error!(error = %err, "Engine pool error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
