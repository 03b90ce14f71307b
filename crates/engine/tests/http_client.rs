//! HTTP engine client against a stub engine served by axum.

use std::time::Duration;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use mlsk_core::endpoint::Endpoint;
use mlsk_core::models::classifier::{
    ClassifierCancelRequest, ClassifierRequest, ClassifierStartRequest, ClassifierType,
};
use mlsk_core::models::time_series::{TimeSeries, TimeSeriesAnalysisRequest, TimeSeriesRow};
use mlsk_engine::client::{EngineApi, EngineRequestError, HttpEngineClient};
use serde_json::{json, Value};

fn series() -> TimeSeries {
    TimeSeries {
        rows: vec![
            TimeSeriesRow {
                date: "2020-01-01".to_string(),
                value: 1.0,
            },
            TimeSeriesRow {
                date: "2020-01-02".to_string(),
                value: 2.0,
            },
        ],
        date_column_name: "Date".to_string(),
        value_column_name: "Value".to_string(),
        date_format: "yyyy-MM-dd".to_string(),
    }
}

/// Stub engine: echoes time series, answers fixed accuracies, and fails
/// classifier starts that have no action columns.
fn stub_engine() -> Router {
    Router::new()
        .route(
            "/time-series-analysis/forecast",
            post(|Json(body): Json<Value>| async move { Json(body["timeSeries"].clone()) }),
        )
        .route(
            "/time-series-analysis/forecast-accuracy",
            post(|| async { Json(json!(0.87)) }),
        )
        .route(
            "/time-series-analysis/predict",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Prediction failed: not enough values",
                )
            }),
        )
        .route(
            "/classifier/start",
            post(|Json(body): Json<Value>| async move {
                if body["actionColumnNames"].as_array().is_some_and(|a| a.is_empty()) {
                    (StatusCode::BAD_REQUEST, "no action columns")
                } else {
                    (StatusCode::OK, "")
                }
            }),
        )
        .route(
            "/classifier/predict",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "requestId": body["requestId"],
                    "columnName": "label",
                    "values": [1, 0]
                }))
            }),
        )
        .route(
            "/classifier/cancel",
            post(|Json(body): Json<Value>| async move {
                if body["classifierType"] == "DECISION_TREE" {
                    StatusCode::OK
                } else {
                    StatusCode::BAD_REQUEST
                }
            }),
        )
        .route(
            "/admin/ping",
            get(|| async {
                Json(json!({
                    "processesDetails": [
                        { "id": 0, "state": "WAITING", "flipFlopCount": 0, "startDatetime": "2021-01-01" }
                    ],
                    "inflightRequestsDetails": []
                }))
            }),
        )
}

async fn serve_stub() -> Endpoint {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, stub_engine()).await.unwrap();
    });
    Endpoint::new("127.0.0.1", port)
}

fn client(endpoint: &Endpoint) -> HttpEngineClient {
    HttpEngineClient::new(endpoint, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn forecast_returns_engine_time_series() {
    let endpoint = serve_stub().await;

    let result = client(&endpoint)
        .forecast(&TimeSeriesAnalysisRequest::new(1, series(), 2))
        .await
        .unwrap();

    assert_eq!(result, series());
}

#[tokio::test]
async fn accuracy_is_a_bare_number() {
    let endpoint = serve_stub().await;

    let accuracy = client(&endpoint)
        .compute_forecast_accuracy(&TimeSeriesAnalysisRequest::new(1, series(), 1))
        .await
        .unwrap();

    assert_eq!(accuracy, 0.87);
}

#[tokio::test]
async fn engine_error_carries_action_and_body() {
    let endpoint = serve_stub().await;

    let err = client(&endpoint)
        .predict(&TimeSeriesAnalysisRequest::new(1, series(), 1))
        .await
        .unwrap_err();

    assert_matches!(err, EngineRequestError::ApiError { status: 500, .. });
    assert_eq!(
        err.to_string(),
        "Failed on call predict to engine: Prediction failed: not enough values"
    );
}

#[tokio::test]
async fn classifier_calls_post_engine_models() {
    let endpoint = serve_stub().await;
    let client = client(&endpoint);

    client
        .start_classifier(&ClassifierStartRequest {
            request_id: 5,
            prediction_column_name: "label".to_string(),
            action_column_names: vec!["a".to_string()],
            number_of_values: 2,
            classifier_type: ClassifierType::DecisionTree,
        })
        .await
        .unwrap();

    let response = client
        .classifier_predict(&ClassifierRequest { request_id: 5 })
        .await
        .unwrap();
    assert_eq!(response.request_id, 5);
    assert_eq!(response.values, vec![1, 0]);

    client
        .cancel_classifier(&ClassifierCancelRequest {
            request_id: 5,
            classifier_type: ClassifierType::DecisionTree,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn rejected_classifier_start_is_an_api_error() {
    let endpoint = serve_stub().await;

    let err = client(&endpoint)
        .start_classifier(&ClassifierStartRequest {
            request_id: 6,
            prediction_column_name: "label".to_string(),
            action_column_names: Vec::new(),
            number_of_values: 2,
            classifier_type: ClassifierType::DecisionTree,
        })
        .await
        .unwrap_err();

    assert_matches!(err, EngineRequestError::ApiError { status: 400, ref body, .. } if body == "no action columns");
    assert_eq!(err.action(), "start");
}

#[tokio::test]
async fn ping_parses_engine_detail() {
    let endpoint = serve_stub().await;

    let detail = client(&endpoint).ping().await.unwrap();

    assert_eq!(detail.processes_details.len(), 1);
    assert!(detail.inflight_requests_details.is_empty());
}

#[tokio::test]
async fn unreachable_engine_is_a_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = client(&Endpoint::new("127.0.0.1", port))
        .ping()
        .await
        .unwrap_err();

    assert_matches!(err, EngineRequestError::Request { action: "ping", .. });
    assert_eq!(err.to_string(), "Failed to call ping to engine");
}
