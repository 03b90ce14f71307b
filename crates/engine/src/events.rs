//! Lifecycle events emitted by worker handles.

use mlsk_core::endpoint::Endpoint;
use serde::Serialize;

/// A lifecycle change of one engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EngineEvent {
    /// A process was started and survived the launch window.
    Launched { endpoint: Endpoint, pid: Option<u32> },

    /// The process exited without being asked to. Every request bound to
    /// the engine under `generation` (or earlier) is lost.
    Died {
        endpoint: Endpoint,
        generation: u64,
        exit_code: Option<i32>,
    },

    /// The relaunch that follows a death failed; the engine stays off.
    RelaunchFailed { endpoint: Endpoint, error: String },

    /// The process was stopped on purpose (shutdown).
    Stopped { endpoint: Endpoint },
}

impl EngineEvent {
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            EngineEvent::Launched { endpoint, .. }
            | EngineEvent::Died { endpoint, .. }
            | EngineEvent::RelaunchFailed { endpoint, .. }
            | EngineEvent::Stopped { endpoint } => endpoint,
        }
    }
}
