//! In-memory engine doubles for tests.
//!
//! [`FakeProcess`] stands in for a supervised OS process and lets a test
//! kill it or make its next launch fail. [`FakeEngineApi`] answers every
//! call with canned data, can be told to fail, and can hold calls open
//! until the test releases them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mlsk_core::endpoint::Endpoint;
use mlsk_core::models::admin::{EngineDetail, ProcessDetail};
use mlsk_core::models::classifier::{
    ClassifierCancelRequest, ClassifierDataRequest, ClassifierRequest, ClassifierResponse,
    ClassifierStartRequest,
};
use mlsk_core::models::time_series::{TimeSeries, TimeSeriesAnalysisRequest};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::client::{EngineApi, EngineRequestError};
use crate::engine::Engine;
use crate::process::{EngineCreationError, ProcessExit, ProcessSupervisor};

/// Accuracy returned by [`FakeEngineApi`] for every accuracy call.
pub const FAKE_ACCURACY: f64 = 0.93;

/// Build an `OFF` engine on `localhost:port` backed by fresh fakes.
pub fn fake_engine(port: u16) -> (Arc<Engine>, Arc<FakeProcess>, Arc<FakeEngineApi>) {
    let endpoint = Endpoint::new("localhost", port);
    let process = Arc::new(FakeProcess::new(endpoint.clone()));
    let api = Arc::new(FakeEngineApi::default());
    let engine = Engine::new(
        endpoint,
        Arc::clone(&process) as Arc<dyn ProcessSupervisor>,
        Arc::clone(&api) as Arc<dyn EngineApi>,
        CancellationToken::new(),
    );
    (engine, process, api)
}

/// Poll `condition` until it holds, panicking after five seconds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ---------------------------------------------------------------------------
// FakeProcess
// ---------------------------------------------------------------------------

pub struct FakeProcess {
    endpoint: Endpoint,
    alive: AtomicBool,
    pid: Mutex<Option<u32>>,
    next_pid: AtomicU32,
    launches: AtomicU32,
    failures: Mutex<VecDeque<String>>,
    exits: Mutex<Option<mpsc::UnboundedSender<ProcessExit>>>,
}

impl FakeProcess {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            alive: AtomicBool::new(false),
            pid: Mutex::new(None),
            next_pid: AtomicU32::new(1000),
            launches: AtomicU32::new(0),
            failures: Mutex::new(VecDeque::new()),
            exits: Mutex::new(None),
        }
    }

    /// Make the next launch exit early with `stderr`.
    pub fn fail_next_launch(&self, stderr: &str) {
        self.failures.lock().unwrap().push_back(stderr.to_string());
    }

    /// Number of launch attempts, successful or not.
    pub fn launches(&self) -> u32 {
        self.launches.load(Ordering::SeqCst)
    }

    /// Simulate an unexpected death of the running process.
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let pid = *self.pid.lock().unwrap();
        if let Some(exits) = self.exits.lock().unwrap().as_ref() {
            let _ = exits.send(ProcessExit {
                pid,
                exit_code: Some(1),
                expected: false,
            });
        }
    }
}

#[async_trait]
impl ProcessSupervisor for FakeProcess {
    async fn launch(
        &self,
        exits: mpsc::UnboundedSender<ProcessExit>,
    ) -> Result<(), EngineCreationError> {
        self.launches.fetch_add(1, Ordering::SeqCst);

        let failure = self.failures.lock().unwrap().pop_front();
        if let Some(stderr) = failure {
            self.alive.store(false, Ordering::SeqCst);
            return Err(EngineCreationError::EarlyExit {
                endpoint: self.endpoint.clone(),
                exit_code: Some(1),
                stderr,
            });
        }

        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        *self.pid.lock().unwrap() = Some(pid);
        *self.exits.lock().unwrap() = Some(exits);
        self.alive.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn pid(&self) -> Option<u32> {
        if self.is_alive() {
            *self.pid.lock().unwrap()
        } else {
            None
        }
    }

    async fn stop(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        let pid = *self.pid.lock().unwrap();
        if let Some(exits) = self.exits.lock().unwrap().as_ref() {
            let _ = exits.send(ProcessExit {
                pid,
                exit_code: None,
                expected: true,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// FakeEngineApi
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeEngineApi {
    calls: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
    fail: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
    last_time_series: Mutex<Option<TimeSeriesAnalysisRequest>>,
    classifier_calls: Mutex<Vec<String>>,
}

impl FakeEngineApi {
    /// Make every following call fail with a 500 from the engine.
    pub fn fail_calls(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Hold every following call until [`FakeEngineApi::release`] lets it
    /// through.
    pub fn hold_calls(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `count` held calls complete.
    pub fn release(&self, count: usize) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(count);
        }
    }

    /// Total number of domain calls received (pings excluded).
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at the same time.
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_time_series_request(&self) -> Option<TimeSeriesAnalysisRequest> {
        self.last_time_series.lock().unwrap().clone()
    }

    /// Names of the classifier calls received, in order.
    pub fn classifier_calls(&self) -> Vec<String> {
        self.classifier_calls.lock().unwrap().clone()
    }

    async fn enter(&self, action: &'static str) -> Result<(), EngineRequestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineRequestError::ApiError {
                action,
                status: 500,
                body: "engine computation failed".to_string(),
            });
        }
        Ok(())
    }

    fn record_time_series(&self, request: &TimeSeriesAnalysisRequest) {
        *self.last_time_series.lock().unwrap() = Some(request.clone());
    }

    fn record_classifier(&self, call: &str) {
        self.classifier_calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl EngineApi for FakeEngineApi {
    async fn forecast(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<TimeSeries, EngineRequestError> {
        self.record_time_series(request);
        self.enter("forecast").await?;
        Ok(request.time_series.clone())
    }

    async fn compute_forecast_accuracy(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<f64, EngineRequestError> {
        self.record_time_series(request);
        self.enter("forecast accuracy").await?;
        Ok(FAKE_ACCURACY)
    }

    async fn predict(
        &self,
        request: &TimeSeriesAnalysisRequest,
    ) -> Result<TimeSeries, EngineRequestError> {
        self.record_time_series(request);
        self.enter("predict").await?;
        Ok(request.time_series.clone())
    }

    async fn start_classifier(
        &self,
        _request: &ClassifierStartRequest,
    ) -> Result<(), EngineRequestError> {
        self.record_classifier("start");
        self.enter("start").await
    }

    async fn classifier_data(
        &self,
        request: &ClassifierDataRequest,
    ) -> Result<(), EngineRequestError> {
        self.record_classifier(&format!("data:{}", request.column_name));
        self.enter("data").await
    }

    async fn classifier_predict(
        &self,
        request: &ClassifierRequest,
    ) -> Result<ClassifierResponse, EngineRequestError> {
        self.record_classifier("predict");
        self.enter("predict").await?;
        Ok(ClassifierResponse {
            request_id: request.request_id,
            column_name: "label".to_string(),
            values: vec![0, 1, 1],
        })
    }

    async fn classifier_predict_accuracy(
        &self,
        _request: &ClassifierRequest,
    ) -> Result<f64, EngineRequestError> {
        self.record_classifier("predict accuracy");
        self.enter("predict accuracy").await?;
        Ok(FAKE_ACCURACY)
    }

    async fn cancel_classifier(
        &self,
        _request: &ClassifierCancelRequest,
    ) -> Result<(), EngineRequestError> {
        self.record_classifier("cancel");
        self.enter("cancel").await
    }

    async fn ping(&self) -> Result<EngineDetail, EngineRequestError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineRequestError::ApiError {
                action: "ping",
                status: 500,
                body: "engine unreachable".to_string(),
            });
        }
        Ok(EngineDetail {
            processes_details: vec![ProcessDetail {
                id: 0,
                state: "WAITING".to_string(),
                flip_flop_count: 0,
                start_datetime: "2021-01-01 00:00:00".to_string(),
            }],
            inflight_requests_details: Vec::new(),
        })
    }
}
