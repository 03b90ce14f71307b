//! Placement of work onto the engine pool.
//!
//! Three ways in:
//!
//! - **Unbound placement** ([`Orchestrator::run_on_engine`],
//!   [`Orchestrator::book_engine_run_and_complete`]): the first `WAITING`
//!   engine in pool order is booked for the duration of one call and
//!   released afterwards, success or failure.
//! - **Bound requests** ([`Orchestrator::book_engine`],
//!   [`Orchestrator::run_on_booked_engine`],
//!   [`Orchestrator::complete_request`]): a request id stays pinned to one
//!   engine across several calls until it is completed.
//! - **Priority runs** ([`Orchestrator::priority_run_on_engine`],
//!   [`Orchestrator::priority_run_on_all_engines`]): admin calls that target
//!   engines directly, whatever their state.
//!
//! Nothing is queued. When no engine is `WAITING` the caller gets
//! [`OrchestratorError::NoAvailableEngine`] straight away.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use mlsk_core::endpoint::Endpoint;
use mlsk_core::models::admin::{BookedRequest, EngineStatus};
use mlsk_core::types::{EngineId, RequestId};
use mlsk_engine::engine::{Engine, EngineError};
use mlsk_engine::events::EngineEvent;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::OrchestratorError;
use crate::request::id_generator::RequestIdGenerator;
use crate::request::registry::RequestRegistry;
use crate::request::Request;

/// How long shutdown waits for each background task.
const SHUTDOWN_TASK_TIMEOUT: Duration = Duration::from_secs(5);

/// Owner of the engine pool.
///
/// Built once at startup; the pool is never resized. Share it behind an
/// `Arc`.
pub struct Orchestrator {
    engines: Vec<Arc<Engine>>,
    /// Held across the first-idle scan and the booking that follows it.
    placement: Mutex<()>,
    registry: RequestRegistry,
    ids: RequestIdGenerator,
    /// Death watchers, one per engine.
    watchers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Take ownership of `engines` (in pool order) and start watching them
    /// for deaths. Must be called from within a Tokio runtime.
    pub fn new(engines: Vec<Arc<Engine>>, cancel: CancellationToken) -> Self {
        let registry = RequestRegistry::default();

        let watchers = engines
            .iter()
            .map(|engine| {
                tokio::spawn(watch_engine_deaths(
                    engine.endpoint().clone(),
                    engine.subscribe(),
                    registry.clone(),
                    cancel.clone(),
                ))
            })
            .collect();

        Self {
            engines,
            placement: Mutex::new(()),
            registry,
            ids: RequestIdGenerator::default(),
            watchers: std::sync::Mutex::new(watchers),
            cancel,
        }
    }

    pub fn engines(&self) -> &[Arc<Engine>] {
        &self.engines
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    pub fn next_request_id(&self) -> RequestId {
        self.ids.next_id()
    }

    /// Launch every engine in pool order. The first failure aborts.
    pub async fn launch_engines(&self) -> Result<(), OrchestratorError> {
        tracing::info!(engines = self.engines.len(), "[Start] Launching engines");
        for engine in &self.engines {
            engine.launch_engine().await?;
        }
        tracing::info!(engines = self.engines.len(), "[End] Launching engines");
        Ok(())
    }

    // ---- priority runs ----

    /// Run `f` on the engine at pool position `engine_id`, ignoring its
    /// state.
    pub async fn priority_run_on_engine<T, F, Fut>(
        &self,
        engine_id: EngineId,
        action: &'static str,
        f: F,
    ) -> Result<T, OrchestratorError>
    where
        F: FnOnce(Arc<Engine>) -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let engine = self
            .engines
            .get(engine_id)
            .ok_or(OrchestratorError::NoEngineWithId { engine_id, action })?;

        tracing::info!(engine_id, engine = %engine.endpoint(), action, "Priority run on engine");
        Ok(f(Arc::clone(engine)).await?)
    }

    /// Run `f` on every engine concurrently, ignoring their state.
    ///
    /// Results come back in pool order; any failure fails the whole call.
    pub async fn priority_run_on_all_engines<T, F, Fut>(
        &self,
        action: &'static str,
        f: F,
    ) -> Result<Vec<T>, OrchestratorError>
    where
        F: Fn(Arc<Engine>) -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        tracing::info!(engines = self.engines.len(), action, "Priority run on all engines");
        let results = join_all(self.engines.iter().map(|engine| f(Arc::clone(engine)))).await;

        results
            .into_iter()
            .map(|result| result.map_err(OrchestratorError::from))
            .collect()
    }

    // ---- unbound placement ----

    /// Run `f` on the first idle engine under a fresh request id.
    pub async fn run_on_engine<T, F, Fut>(
        &self,
        action: &'static str,
        f: F,
    ) -> Result<T, OrchestratorError>
    where
        F: FnOnce(Arc<Engine>) -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let request_id = self.next_request_id();
        self.book_engine_run_and_complete(request_id, action, f)
            .await
    }

    /// Book, run once, complete. The request is completed even when the
    /// run fails.
    pub async fn book_engine_run_and_complete<T, F, Fut>(
        &self,
        request_id: RequestId,
        action: &'static str,
        f: F,
    ) -> Result<T, OrchestratorError>
    where
        F: FnOnce(Arc<Engine>) -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        self.book_engine(request_id, action).await?;
        let result = self.run_on_booked_engine(request_id, action, f).await;
        self.complete_request(request_id, action).await;
        result
    }

    // ---- bound requests ----

    /// Book the first `WAITING` engine in pool order for `request_id`.
    ///
    /// Fails with [`OrchestratorError::NoAvailableEngine`] without waiting
    /// when every engine is busy or off.
    pub async fn book_engine(
        &self,
        request_id: RequestId,
        action: &'static str,
    ) -> Result<Endpoint, OrchestratorError> {
        let _placement = self.placement.lock().await;

        let Some((engine, generation)) = self
            .engines
            .iter()
            .find_map(|engine| engine.book_engine().map(|generation| (engine, generation)))
        else {
            tracing::warn!(request_id, action, "No available engine");
            return Err(OrchestratorError::NoAvailableEngine(action));
        };

        let endpoint = engine.endpoint().clone();
        let request = Request::new(request_id, action, endpoint.clone(), generation);
        if let Err(e) = self.registry.add_request(request).await {
            engine.release_engine();
            return Err(e);
        }

        tracing::info!(request_id, action, engine = %endpoint, "Engine booked");
        Ok(endpoint)
    }

    /// Run `f` on the engine bound to `request_id`.
    ///
    /// Calls under the same request id are serialized. A binding whose
    /// engine has been relaunched since booking is dropped and reported as
    /// [`OrchestratorError::NoBookedEngine`].
    pub async fn run_on_booked_engine<T, F, Fut>(
        &self,
        request_id: RequestId,
        action: &'static str,
        f: F,
    ) -> Result<T, OrchestratorError>
    where
        F: FnOnce(Arc<Engine>) -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let no_booked_engine = || OrchestratorError::NoBookedEngine { request_id, action };

        let request = self
            .registry
            .get_request(request_id)
            .await
            .ok_or_else(no_booked_engine)?;
        let _request_guard = request.lock().await;

        // Completed or dropped while waiting for the lock.
        match self.registry.get_request(request_id).await {
            Some(current) if Arc::ptr_eq(&current, &request) => {}
            _ => return Err(no_booked_engine()),
        }

        let engine = self.engine_with_endpoint(request.endpoint(), action)?;
        if engine.generation() != request.generation() {
            self.registry.remove_request(request_id).await;
            tracing::warn!(
                request_id,
                action,
                engine = %request.endpoint(),
                "Engine was relaunched since booking, request dropped",
            );
            return Err(no_booked_engine());
        }

        tracing::debug!(request_id, action, engine = %request.endpoint(), "Running on booked engine");
        Ok(f(Arc::clone(engine)).await?)
    }

    /// Remove the binding of `request_id` and release its engine.
    ///
    /// Returns the removed entry, or `None` when there was nothing to
    /// complete.
    pub async fn complete_request(
        &self,
        request_id: RequestId,
        action: &'static str,
    ) -> Option<Arc<Request>> {
        let request = self.registry.get_request(request_id).await?;
        let _request_guard = request.lock().await;

        let removed = self.registry.remove_request(request_id).await?;

        match self.engine_with_endpoint(removed.endpoint(), action) {
            // A relaunched engine was never booked by this request.
            Ok(engine) if engine.generation() == removed.generation() => engine.release_engine(),
            Ok(_) => {}
            Err(e) => tracing::error!(request_id, error = %e, "Cannot release engine"),
        }

        tracing::info!(request_id, action, engine = %removed.endpoint(), "Request completed");
        Some(removed)
    }

    // ---- listings ----

    /// Status of every engine, in pool order.
    pub fn engine_statuses(&self) -> Vec<EngineStatus> {
        self.engines
            .iter()
            .enumerate()
            .map(|(id, engine)| engine.status(id))
            .collect()
    }

    /// Every request currently bound to an engine, ordered by id.
    pub async fn booked_requests(&self) -> Vec<BookedRequest> {
        self.registry
            .requests()
            .await
            .iter()
            .map(|request| request.to_booked_request())
            .collect()
    }

    /// Stop every engine process, then the background tasks.
    pub async fn shutdown(&self) {
        tracing::info!("[Start] Shutting down engines");
        join_all(self.engines.iter().map(|engine| engine.stop())).await;

        self.cancel.cancel();
        let watchers: Vec<_> = self
            .watchers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .drain(..)
            .collect();
        for watcher in watchers {
            let _ = tokio::time::timeout(SHUTDOWN_TASK_TIMEOUT, watcher).await;
        }
        tracing::info!("[End] Shutting down engines");
    }

    // ---- private helpers ----

    fn engine_with_endpoint(
        &self,
        endpoint: &Endpoint,
        action: &'static str,
    ) -> Result<&Arc<Engine>, OrchestratorError> {
        self.engines
            .iter()
            .find(|engine| engine.endpoint() == endpoint)
            .ok_or_else(|| {
                tracing::error!(engine = %endpoint, action, "Registry points outside the pool");
                OrchestratorError::NoEngineWithEndpoint {
                    endpoint: endpoint.clone(),
                    action,
                }
            })
    }
}

/// Drop the bindings of an engine each time it dies. The relaunched
/// process knows nothing about them.
async fn watch_engine_deaths(
    endpoint: Endpoint,
    mut events: broadcast::Receiver<EngineEvent>,
    registry: RequestRegistry,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(EngineEvent::Died { generation, .. }) => {
                let dropped = registry.remove_requests_for(&endpoint, generation).await;
                if !dropped.is_empty() {
                    tracing::warn!(
                        engine = %endpoint,
                        requests = ?dropped,
                        "Engine died, bound requests dropped",
                    );
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(engine = %endpoint, skipped, "Engine event watcher lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
