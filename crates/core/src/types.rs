/// Identifier of a client request, unique for the lifetime of the process.
pub type RequestId = u64;

/// Position of an engine in the orchestrator pool.
pub type EngineId = usize;

/// UTC timestamp used in status reports.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
