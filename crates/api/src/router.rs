//! Application router for the engine orchestration service.
//!
//! [`build_app_router`] is shared by the `mlsk-service` binary and the
//! integration tests (`tests/common/mod.rs`), so both exercise the same
//! routes and the same middleware stack.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

/// Header carrying the per-request correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// How long browsers may cache a CORS preflight answer.
const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// Build the full application [`Router`].
///
/// Routes live at the root: `/health`, `/time-series-analysis/*`,
/// `/{classifier_type}/*` and `/admin/*`. Middleware runs outermost first:
///
/// 1. CORS
/// 2. Request id assignment
/// 3. Request/response tracing
/// 4. Request id echoed on the response
/// 5. Request timeout
/// 6. Panic recovery
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let routes = Router::new()
        .merge(routes::health::router())
        .merge(routes::api_routes());

    with_middleware(routes, config).with_state(state)
}

/// Build the CORS layer for the configured front-end origins.
///
/// Only `GET` and `POST` are served. Origins are validated when the
/// configuration is loaded; any that still fail to parse are skipped with a
/// warning.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(CORS_MAX_AGE)
}

// ---- private helpers ----

/// Wrap `routes` in the middleware stack. Layers added last run first.
fn with_middleware(routes: Router<AppState>, config: &ServerConfig) -> Router<AppState> {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    routes
        // A panicking handler becomes a 500 instead of a dropped connection.
        .layer(CatchPanicLayer::new())
        // Bounds the wait of the HTTP client only. The orchestrated call runs
        // on its own task and still releases its engine when it finishes.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // Echo the id so clients can quote it when reporting a failed call.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // One span per request; engine and orchestrator logs nest under it.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Keep an id supplied by the caller, otherwise mint a UUID.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(build_cors_layer(config))
}
