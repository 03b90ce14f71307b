use axum::routing::get;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Admin routes mounted at `/admin`.
///
/// ```text
/// GET /ping                   -> ping_all
/// GET /ping/{engine_id}       -> ping
/// GET /engines                -> list_engines
/// GET /requests               -> list_requests
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(admin::ping_all))
        .route("/ping/{engine_id}", get(admin::ping))
        .route("/engines", get(admin::list_engines))
        .route("/requests", get(admin::list_requests))
}
