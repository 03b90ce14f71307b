#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use mlsk_api::config::ServerConfig;
use mlsk_api::router::build_app_router;
use mlsk_api::state::AppState;
use mlsk_engine::testing::{fake_engine, FakeEngineApi, FakeProcess};
use mlsk_orchestrator::orchestrator::Orchestrator;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:4200".to_string()],
        request_timeout_secs: 30,
    }
}

/// The app under test plus handles on its fake engines.
pub struct TestApp {
    pub router: Router,
    pub orchestrator: Arc<Orchestrator>,
    pub processes: Vec<Arc<FakeProcess>>,
    pub apis: Vec<Arc<FakeEngineApi>>,
}

impl TestApp {
    /// A fresh clone of the router, ready for `oneshot`.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router over `engines` launched fake engines.
///
/// Uses [`build_app_router`] so integration tests exercise the same
/// middleware stack as production.
pub async fn build_test_app(engines: usize) -> TestApp {
    let mut pool = Vec::new();
    let mut processes = Vec::new();
    let mut apis = Vec::new();
    for i in 0..engines {
        let (engine, process, api) = fake_engine(6767 + i as u16);
        pool.push(engine);
        processes.push(process);
        apis.push(api);
    }

    let orchestrator = Arc::new(Orchestrator::new(pool, CancellationToken::new()));
    orchestrator.launch_engines().await.unwrap();

    let config = test_config();
    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        orchestrator,
        processes,
        apis,
    }
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert an error response and return its body.
pub async fn expect_error(response: Response, status: StatusCode, code: &str) -> Value {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code, "unexpected error body: {json}");
    json
}

/// A three-row series, as posted by clients.
pub fn time_series_json() -> Value {
    json!({
        "rows": [
            { "date": "2021-01-01", "value": 10.0 },
            { "date": "2021-01-02", "value": 12.5 },
            { "date": "2021-01-03", "value": 11.0 }
        ],
        "dateColumnName": "Date",
        "valueColumnName": "Sales",
        "dateFormat": "yyyy-MM-dd"
    })
}
