use axum::routing::post;
use axum::Router;

use crate::handlers::time_series;
use crate::state::AppState;

/// Routes mounted at `/time-series-analysis`.
///
/// ```text
/// POST /forecast              -> forecast
/// POST /forecast-vs-actual    -> forecast_vs_actual
/// POST /forecast-accuracy     -> forecast_accuracy
/// POST /predict               -> predict
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/forecast", post(time_series::forecast))
        .route("/forecast-vs-actual", post(time_series::forecast_vs_actual))
        .route("/forecast-accuracy", post(time_series::forecast_accuracy))
        .route("/predict", post(time_series::predict))
}
