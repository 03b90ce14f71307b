//! Worker handle for one engine.
//!
//! [`Engine`] owns the state flag of an endpoint, its process supervisor
//! and its API client. Domain calls are serialized per engine and run
//! under the `COMPUTING` state; process deaths are handled by a control
//! task that sets the engine `OFF` and relaunches it once.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use mlsk_core::endpoint::Endpoint;
use mlsk_core::engine_state::EngineState;
use mlsk_core::models::admin::{EngineDetail, EngineStatus};
use mlsk_core::models::classifier::{
    ClassifierCancelRequest, ClassifierDataRequest, ClassifierRequest, ClassifierResponse,
    ClassifierStartRequest,
};
use mlsk_core::models::time_series::{TimeSeries, TimeSeriesAnalysisRequest};
use mlsk_core::types::{EngineId, Timestamp};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::client::{EngineApi, EngineRequestError, HttpEngineClient};
use crate::config::EngineConfig;
use crate::events::EngineEvent;
use crate::process::{
    EngineCreationError, ProcessExit, ProcessSettings, ProcessSupervisor, ResilientProcess,
};

/// Broadcast channel capacity for lifecycle events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Errors from a domain call on an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine has no live process.
    #[error("Engine {0} is off")]
    EngineOff(Endpoint),

    #[error(transparent)]
    Request(#[from] EngineRequestError),
}

/// Handle to one pooled engine.
pub struct Engine {
    endpoint: Endpoint,
    state: Mutex<EngineState>,
    /// Held for the whole duration of a domain call.
    operation: tokio::sync::Mutex<()>,
    /// Serializes launches (startup, relaunch after death).
    lifecycle: tokio::sync::Mutex<()>,
    process: Arc<dyn ProcessSupervisor>,
    client: Arc<dyn EngineApi>,
    exits_tx: mpsc::UnboundedSender<ProcessExit>,
    event_tx: broadcast::Sender<EngineEvent>,
    /// Incremented on every successful launch.
    generation: AtomicU64,
    restarts: AtomicU32,
    launched_at: Mutex<Option<Timestamp>>,
}

impl Engine {
    /// Create a handle in the `OFF` state and spawn its control task.
    ///
    /// Must be called from within a Tokio runtime. The control task stops
    /// when `cancel` fires or when the handle is dropped.
    pub fn new(
        endpoint: Endpoint,
        process: Arc<dyn ProcessSupervisor>,
        client: Arc<dyn EngineApi>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let (exits_tx, exits_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Arc::new(Self {
            endpoint,
            state: Mutex::new(EngineState::Off),
            operation: tokio::sync::Mutex::new(()),
            lifecycle: tokio::sync::Mutex::new(()),
            process,
            client,
            exits_tx,
            event_tx,
            generation: AtomicU64::new(0),
            restarts: AtomicU32::new(0),
            launched_at: Mutex::new(None),
        });

        tokio::spawn(run_control_loop(Arc::downgrade(&engine), exits_rx, cancel));
        engine
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> EngineState {
        *self.lock_state()
    }

    /// Number of successful launches so far. A request booked under one
    /// generation cannot be served by a later one.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Subscribe to lifecycle events of this engine.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    pub fn status(&self, id: EngineId) -> EngineStatus {
        EngineStatus {
            id,
            endpoint: self.endpoint.clone(),
            state: self.state(),
            pid: self.process.pid(),
            launched_at: *self.launched_at.lock().unwrap_or_else(PoisonError::into_inner),
            restarts: self.restarts.load(Ordering::SeqCst),
        }
    }

    // ---- lifecycle ----

    /// Launch the engine process unless one is already up.
    ///
    /// Success leaves the engine `WAITING`; failure leaves it `OFF` and is
    /// returned to the caller.
    pub async fn launch_engine(&self) -> Result<(), EngineCreationError> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.state() != EngineState::Off && self.process.is_alive() {
            tracing::debug!(engine = %self.endpoint, "Engine already running, launch skipped");
            return Ok(());
        }

        tracing::info!(engine = %self.endpoint, "[Start] Launching engine");
        let result = self.process.launch(self.exits_tx.clone()).await;
        match &result {
            Ok(()) => {
                *self.launched_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
                {
                    // The new generation becomes visible together with WAITING.
                    let mut state = self.lock_state();
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    *state = EngineState::Waiting;
                }
                let _ = self.event_tx.send(EngineEvent::Launched {
                    endpoint: self.endpoint.clone(),
                    pid: self.process.pid(),
                });
                tracing::info!(engine = %self.endpoint, pid = self.process.pid(), "Engine launched");
            }
            Err(e) => {
                self.set_state(EngineState::Off);
                tracing::error!(engine = %self.endpoint, error = %e, "Failed to launch engine");
            }
        }
        tracing::info!(engine = %self.endpoint, "[End] Launching engine");
        result
    }

    /// React to the exit of the engine process.
    ///
    /// An unexpected death turns the engine `OFF` and triggers a single
    /// relaunch attempt. A failed relaunch is logged and the engine stays
    /// `OFF`.
    pub async fn on_engine_killed(&self, exit: ProcessExit) {
        if self.process.is_alive() && self.process.pid() != exit.pid {
            tracing::debug!(engine = %self.endpoint, pid = exit.pid, "Ignoring exit of a replaced engine process");
            return;
        }

        self.set_state(EngineState::Off);

        if exit.expected {
            tracing::info!(engine = %self.endpoint, pid = exit.pid, "Engine stopped");
            let _ = self.event_tx.send(EngineEvent::Stopped {
                endpoint: self.endpoint.clone(),
            });
            return;
        }

        tracing::error!(
            engine = %self.endpoint,
            pid = exit.pid,
            exit_code = exit.exit_code,
            "Engine died unexpectedly",
        );
        let _ = self.event_tx.send(EngineEvent::Died {
            endpoint: self.endpoint.clone(),
            generation: self.generation(),
            exit_code: exit.exit_code,
        });

        tracing::info!(engine = %self.endpoint, "[Start] Relaunching engine");
        match self.launch_engine().await {
            Ok(()) => {
                self.restarts.fetch_add(1, Ordering::SeqCst);
                tracing::info!(engine = %self.endpoint, "Engine relaunched successfully");
            }
            Err(e) => {
                tracing::error!(engine = %self.endpoint, error = %e, "Error while relaunching engine");
                let _ = self.event_tx.send(EngineEvent::RelaunchFailed {
                    endpoint: self.endpoint.clone(),
                    error: e.to_string(),
                });
            }
        }
        tracing::info!(engine = %self.endpoint, "[End] Relaunching engine");
    }

    /// Stop the engine process and leave the engine `OFF`.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.process.stop().await;
        self.set_state(EngineState::Off);
    }

    // ---- booking ----

    /// Reserve a `WAITING` engine and return the generation it was booked
    /// under. Returns `None` when the engine was in any other state, in
    /// which case nothing changes.
    pub fn book_engine(&self) -> Option<u64> {
        let mut state = self.lock_state();
        if *state != EngineState::Waiting {
            return None;
        }
        *state = EngineState::Booked;
        Some(self.generation())
    }

    /// Return a `BOOKED` engine to `WAITING`. Other states are left as is.
    pub fn release_engine(&self) {
        let mut state = self.lock_state();
        if *state == EngineState::Booked {
            *state = EngineState::Waiting;
        }
    }

    // ---- time series ----

    pub async fn forecast(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<TimeSeries, EngineError> {
        self.call_on_engine("forecast", self.client.forecast(request))
            .await
    }

    pub async fn compute_forecast_accuracy(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<f64, EngineError> {
        self.call_on_engine(
            "forecast accuracy",
            self.client.compute_forecast_accuracy(request),
        )
        .await
    }

    pub async fn predict(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<TimeSeries, EngineError> {
        self.call_on_engine("predict", self.client.predict(request))
            .await
    }

    // ---- classifier ----

    pub async fn start_classifier(
        &self,
        request: &ClassifierStartRequest,
    ) -> Result<(), EngineError> {
        self.call_on_engine("classifier start", self.client.start_classifier(request))
            .await
    }

    pub async fn classifier_data(&self, request: &ClassifierDataRequest) -> Result<(), EngineError> {
        self.call_on_engine("classifier data", self.client.classifier_data(request))
            .await
    }

    pub async fn classifier_predict(
        &self,
        request: &ClassifierRequest,
    ) -> Result<ClassifierResponse, EngineError> {
        self.call_on_engine("classifier predict", self.client.classifier_predict(request))
            .await
    }

    pub async fn classifier_predict_accuracy(
        &self,
        request: &ClassifierRequest,
    ) -> Result<f64, EngineError> {
        self.call_on_engine(
            "classifier predict accuracy",
            self.client.classifier_predict_accuracy(request),
        )
        .await
    }

    pub async fn cancel_classifier(
        &self,
        request: &ClassifierCancelRequest,
    ) -> Result<(), EngineError> {
        self.call_on_engine("classifier cancel", self.client.cancel_classifier(request))
            .await
    }

    // ---- admin ----

    /// Ask the engine for its process and request details.
    ///
    /// Pings bypass the per-engine call lock and leave the state untouched,
    /// so they answer even while a long computation is running.
    pub async fn ping(&self) -> Result<EngineDetail, EngineError> {
        Ok(self.client.ping().await?)
    }

    // ---- private helpers ----

    /// Run a remote call under the `COMPUTING` state.
    ///
    /// The previous state is restored afterwards, unless the engine died in
    /// the meantime.
    async fn call_on_engine<T>(
        &self,
        call_name: &'static str,
        call: impl Future<Output = Result<T, EngineRequestError>>,
    ) -> Result<T, EngineError> {
        let _operation = self.operation.lock().await;

        let previous = {
            let mut state = self.lock_state();
            if *state == EngineState::Off {
                return Err(EngineError::EngineOff(self.endpoint.clone()));
            }
            std::mem::replace(&mut *state, EngineState::Computing)
        };
        tracing::info!(engine = %self.endpoint, call = call_name, "Engine computing request");

        let result = call.await;

        {
            let mut state = self.lock_state();
            if *state == EngineState::Computing {
                *state = previous;
            }
        }

        match &result {
            Ok(_) => tracing::info!(
                engine = %self.endpoint,
                call = call_name,
                state = %self.state(),
                "Engine done computing request",
            ),
            Err(e) => tracing::error!(
                engine = %self.endpoint,
                call = call_name,
                error = %e,
                "Error while computing request on engine",
            ),
        }

        Ok(result?)
    }

    fn set_state(&self, state: EngineState) {
        *self.lock_state() = state;
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build one `OFF` engine per configured endpoint, in configured order.
///
/// The engines share a single HTTP connection pool. Each control task
/// listens to a child of `cancel`.
pub fn pool_from_config(
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<Vec<Arc<Engine>>, reqwest::Error> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    Ok(config
        .endpoints()
        .into_iter()
        .map(|endpoint| {
            let settings = ProcessSettings::for_engine(config, &endpoint);
            let process = ResilientProcess::new(endpoint.clone(), settings);
            let client = HttpEngineClient::with_client(http.clone(), &endpoint);
            Engine::new(endpoint, Arc::new(process), Arc::new(client), cancel.child_token())
        })
        .collect())
}

/// Process exit notifications for one engine, handled one at a time.
async fn run_control_loop(
    engine: Weak<Engine>,
    mut exits: mpsc::UnboundedReceiver<ProcessExit>,
    cancel: CancellationToken,
) {
    loop {
        let exit = tokio::select! {
            () = cancel.cancelled() => break,
            exit = exits.recv() => match exit {
                Some(exit) => exit,
                None => break,
            },
        };

        let Some(engine) = engine.upgrade() else {
            break;
        };
        engine.on_engine_killed(exit).await;
    }
}
