//! Time-series analysis: one engine call per request, on the first idle
//! engine.

use std::future::Future;
use std::sync::Arc;

use mlsk_core::actions::{
    TIME_SERIES_FORECAST, TIME_SERIES_FORECAST_ACCURACY, TIME_SERIES_FORECAST_VS_ACTUAL,
    TIME_SERIES_PREDICT,
};
use mlsk_core::models::time_series::{TimeSeries, TimeSeriesAnalysisRequest};
use mlsk_engine::engine::{Engine, EngineError};
use mlsk_orchestrator::orchestrator::Orchestrator;

use super::detached;
use crate::error::AppResult;

pub async fn forecast(
    orchestrator: Arc<Orchestrator>,
    time_series: TimeSeries,
    number_of_values: usize,
) -> AppResult<TimeSeries> {
    let request = new_request(&orchestrator, time_series, number_of_values);
    run(orchestrator, TIME_SERIES_FORECAST, request, |engine, request| async move {
        engine.forecast(&request).await
    })
    .await
}

/// Forecast the last `number_of_values` known values from the rows before
/// them, so the caller can compare forecast and actual values.
pub async fn forecast_vs_actual(
    orchestrator: Arc<Orchestrator>,
    time_series: TimeSeries,
    number_of_values: usize,
) -> AppResult<TimeSeries> {
    let request = new_request(&orchestrator, time_series, number_of_values)
        .for_forecast_vs_actual()?;
    run(orchestrator, TIME_SERIES_FORECAST_VS_ACTUAL, request, |engine, request| async move {
        engine.forecast(&request).await
    })
    .await
}

pub async fn compute_forecast_accuracy(
    orchestrator: Arc<Orchestrator>,
    time_series: TimeSeries,
    number_of_values: usize,
) -> AppResult<f64> {
    let request = new_request(&orchestrator, time_series, number_of_values);
    run(orchestrator, TIME_SERIES_FORECAST_ACCURACY, request, |engine, request| async move {
        engine.compute_forecast_accuracy(&request).await
    })
    .await
}

pub async fn predict(
    orchestrator: Arc<Orchestrator>,
    time_series: TimeSeries,
    number_of_values: usize,
) -> AppResult<TimeSeries> {
    let request = new_request(&orchestrator, time_series, number_of_values);
    run(orchestrator, TIME_SERIES_PREDICT, request, |engine, request| async move {
        engine.predict(&request).await
    })
    .await
}

// ---- private helpers ----

fn new_request(
    orchestrator: &Orchestrator,
    time_series: TimeSeries,
    number_of_values: usize,
) -> TimeSeriesAnalysisRequest {
    TimeSeriesAnalysisRequest::new(orchestrator.next_request_id(), time_series, number_of_values)
}

/// Book an engine for `request`, run `call` on it and complete the request.
async fn run<T, F, Fut>(
    orchestrator: Arc<Orchestrator>,
    action: &'static str,
    request: TimeSeriesAnalysisRequest,
    call: F,
) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(Arc<Engine>, TimeSeriesAnalysisRequest) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, EngineError>> + Send + 'static,
{
    let request_id = request.request_id;
    tracing::info!(request_id, action, rows = request.time_series.rows.len(), "[Start] Time series analysis");

    let result = detached(async move {
        Ok(orchestrator
            .book_engine_run_and_complete(request_id, action, move |engine| call(engine, request))
            .await?)
    })
    .await;

    match &result {
        Ok(_) => tracing::info!(request_id, action, "[End] Time series analysis"),
        Err(e) => tracing::error!(request_id, action, error = %e, "[End] Time series analysis failed"),
    }
    result
}
