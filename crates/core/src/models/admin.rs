use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;
use crate::engine_state::EngineState;
use crate::types::{EngineId, RequestId, Timestamp};

/// Answer of an engine to an admin ping, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineDetail {
    pub processes_details: Vec<ProcessDetail>,
    pub inflight_requests_details: Vec<RequestDetail>,
}

/// A worker process inside an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDetail {
    pub id: i64,
    pub state: String,
    pub flip_flop_count: i64,
    pub start_datetime: String,
}

/// A request currently held by an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetail {
    pub id: i64,
    #[serde(rename = "type")]
    pub request_type: String,
    pub creation_datetime: String,
}

/// The service's own view of one pooled engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub id: EngineId,
    pub endpoint: Endpoint,
    pub state: EngineState,
    /// OS process id, when a process is running.
    pub pid: Option<u32>,
    /// Time of the last successful launch.
    pub launched_at: Option<Timestamp>,
    /// Number of relaunches after an unexpected death.
    pub restarts: u32,
}

/// A request bound to an engine across several calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedRequest {
    pub request_id: RequestId,
    pub action_name: String,
    pub endpoint: Endpoint,
    pub created_at: Timestamp,
}
