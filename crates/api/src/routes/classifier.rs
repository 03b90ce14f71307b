use axum::routing::post;
use axum::Router;

use crate::handlers::classifier;
use crate::state::AppState;

/// Classifier routes. Unknown classifier types are answered with 404 by
/// the handlers.
///
/// ```text
/// POST /{classifier_type}/start               -> start
/// POST /{classifier_type}/data                -> data
/// POST /{classifier_type}/predict             -> predict
/// POST /{classifier_type}/predict-accuracy    -> predict_accuracy
/// POST /{classifier_type}/cancel              -> cancel
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{classifier_type}/start", post(classifier::start))
        .route("/{classifier_type}/data", post(classifier::data))
        .route("/{classifier_type}/predict", post(classifier::predict))
        .route(
            "/{classifier_type}/predict-accuracy",
            post(classifier::predict_accuracy),
        )
        .route("/{classifier_type}/cancel", post(classifier::cancel))
}
