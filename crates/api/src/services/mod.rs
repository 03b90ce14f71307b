//! Service layer: one module per API area, driving the orchestrator.
//!
//! Every call that books an engine runs on its own task (see
//! [`detached`]), so a client that disconnects mid-request cannot drop the
//! future between booking and completion and leave an engine `BOOKED`.

pub mod admin;
pub mod classifier;
pub mod time_series;

use std::future::Future;

use crate::error::{AppError, AppResult};

/// Run `work` to completion on a spawned task and wait for its result.
pub(crate) async fn detached<T, Fut>(work: Fut) -> AppResult<T>
where
    Fut: Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| AppError::InternalError(format!("Orchestrated task failed: {e}")))?
}
