use mlsk_core::endpoint::Endpoint;
use mlsk_core::types::{EngineId, RequestId};
use mlsk_engine::engine::EngineError;
use mlsk_engine::process::EngineCreationError;

/// Errors raised while placing or running work on the engine pool.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Every engine is busy or off. Nothing is queued; the caller may retry.
    #[error("No available engine to run {0}, please try again later")]
    NoAvailableEngine(&'static str),

    /// The request id is not bound to an engine (never booked, already
    /// completed, or lost with a dead engine).
    #[error("No available engine with {request_id} to run {action}")]
    NoBookedEngine {
        request_id: RequestId,
        action: &'static str,
    },

    /// A registry entry points at an endpoint outside the pool.
    #[error("No engine found with information {endpoint} to run {action} - NOT EXPECTED - check logs!")]
    NoEngineWithEndpoint {
        endpoint: Endpoint,
        action: &'static str,
    },

    #[error("No engine found with id {engine_id} to run {action}")]
    NoEngineWithId {
        engine_id: EngineId,
        action: &'static str,
    },

    #[error("Request {0} is already registered")]
    DuplicateRequest(RequestId),

    #[error(transparent)]
    EngineCreation(#[from] EngineCreationError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
