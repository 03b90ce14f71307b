//! Handlers for the time-series analysis endpoints.

use axum::extract::State;
use axum::Json;
use mlsk_core::models::time_series::TimeSeries;
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::time_series;
use crate::state::AppState;

/// Request body shared by every time-series endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesAnalysisBody {
    pub time_series: TimeSeries,
    pub number_of_values: usize,
}

/// POST /time-series-analysis/forecast
pub async fn forecast(
    State(state): State<AppState>,
    Json(body): Json<TimeSeriesAnalysisBody>,
) -> AppResult<Json<TimeSeries>> {
    let forecast =
        time_series::forecast(state.orchestrator, body.time_series, body.number_of_values).await?;
    Ok(Json(forecast))
}

/// POST /time-series-analysis/forecast-vs-actual
pub async fn forecast_vs_actual(
    State(state): State<AppState>,
    Json(body): Json<TimeSeriesAnalysisBody>,
) -> AppResult<Json<TimeSeries>> {
    let forecast = time_series::forecast_vs_actual(
        state.orchestrator,
        body.time_series,
        body.number_of_values,
    )
    .await?;
    Ok(Json(forecast))
}

/// POST /time-series-analysis/forecast-accuracy
///
/// Responds with a bare JSON number.
pub async fn forecast_accuracy(
    State(state): State<AppState>,
    Json(body): Json<TimeSeriesAnalysisBody>,
) -> AppResult<Json<f64>> {
    let accuracy = time_series::compute_forecast_accuracy(
        state.orchestrator,
        body.time_series,
        body.number_of_values,
    )
    .await?;
    Ok(Json(accuracy))
}

/// POST /time-series-analysis/predict
pub async fn predict(
    State(state): State<AppState>,
    Json(body): Json<TimeSeriesAnalysisBody>,
) -> AppResult<Json<TimeSeries>> {
    let prediction =
        time_series::predict(state.orchestrator, body.time_series, body.number_of_values).await?;
    Ok(Json(prediction))
}
