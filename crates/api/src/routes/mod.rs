pub mod admin;
pub mod classifier;
pub mod health;
pub mod time_series;

use axum::Router;

use crate::state::AppState;

/// Build the service route tree.
///
/// Route hierarchy:
///
/// ```text
/// /time-series-analysis/forecast                   forecast (POST)
/// /time-series-analysis/forecast-vs-actual         forecast vs actual (POST)
/// /time-series-analysis/forecast-accuracy          forecast accuracy (POST)
/// /time-series-analysis/predict                    predict (POST)
///
/// /{classifier_type}/start                         start a run (POST)
/// /{classifier_type}/data                          send a column (POST)
/// /{classifier_type}/predict                       predict, ends the run (POST)
/// /{classifier_type}/predict-accuracy              accuracy, ends the run (POST)
/// /{classifier_type}/cancel                        cancel, ends the run (POST)
///
/// /admin/ping                                      ping every engine (GET)
/// /admin/ping/{engine_id}                          ping one engine (GET)
/// /admin/engines                                   engine statuses (GET)
/// /admin/requests                                  booked requests (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/time-series-analysis", time_series::router())
        .nest("/admin", admin::router())
        .merge(classifier::router())
}
