//! Engine pool orchestration.
//!
//! [`orchestrator::Orchestrator`] owns the fixed pool of engines and
//! places work on them: first idle engine wins, and a caller that finds no
//! idle engine is refused immediately. Multi-call workflows book an engine
//! under a request id ([`request`]) so that every call of the workflow
//! reaches the same engine.

pub mod error;
pub mod orchestrator;
pub mod request;
