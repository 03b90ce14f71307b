//! Lifecycle state of a single engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a worker handle.
///
/// ```text
///            launch ok            book               call
///   OFF ───────────────> WAITING ──────> BOOKED ──────────> COMPUTING
///    ^                     ^  ^            │                   │
///    │ process died        │  └── release ─┘                   │
///    │                     └──────── call finished ────────────┘
///    └──────────────────────── (from any state)
/// ```
///
/// Only `Waiting` engines are eligible for new, unbound placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineState {
    /// No live process backs the endpoint.
    Off,
    /// Process alive and idle.
    Waiting,
    /// Reserved for a request id, no remote call in flight.
    Booked,
    /// A remote call is in flight.
    Computing,
}

impl EngineState {
    /// Whether an engine in this state may receive a new unbound request.
    pub fn is_available(self) -> bool {
        self == EngineState::Waiting
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::Off => "OFF",
            EngineState::Waiting => "WAITING",
            EngineState::Booked => "BOOKED",
            EngineState::Computing => "COMPUTING",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
