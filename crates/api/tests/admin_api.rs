//! Integration tests for the admin endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, expect_error, get, post_json};
use mlsk_engine::testing::wait_until;
use serde_json::json;

#[tokio::test]
async fn ping_all_returns_one_detail_per_engine() {
    let app = build_test_app(3).await;

    let response = get(app.app(), "/admin/ping").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let details = json.as_array().unwrap();
    assert_eq!(details.len(), 3);
    assert_eq!(details[0]["processesDetails"][0]["state"], "WAITING");
    assert!(details[0]["inflightRequestsDetails"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn ping_one_engine_by_id() {
    let app = build_test_app(2).await;

    let response = get(app.app(), "/admin/ping/1").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["processesDetails"][0]["flipFlopCount"], 0);
}

#[tokio::test]
async fn ping_unknown_engine_returns_404() {
    let app = build_test_app(2).await;

    let response = get(app.app(), "/admin/ping/7").await;

    let json = expect_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    assert_eq!(json["error"], "No engine found with id 7 to run admin-ping");
}

#[tokio::test]
async fn ping_reaches_a_busy_engine() {
    let app = build_test_app(1).await;
    app.apis[0].hold_calls();
    let in_flight = tokio::spawn(post_json(
        app.app(),
        "/time-series-analysis/forecast",
        json!({ "timeSeries": common::time_series_json(), "numberOfValues": 1 }),
    ));
    wait_until("call in flight", || app.apis[0].in_flight() == 1).await;

    let response = get(app.app(), "/admin/ping/0").await;
    assert_eq!(response.status(), StatusCode::OK);

    app.apis[0].release(1);
    in_flight.await.unwrap();
}

#[tokio::test]
async fn failing_ping_maps_to_bad_gateway() {
    let app = build_test_app(2).await;
    app.apis[1].fail_calls(true);

    let response = get(app.app(), "/admin/ping").await;

    expect_error(response, StatusCode::BAD_GATEWAY, "ENGINE_ERROR").await;
}

#[tokio::test]
async fn engines_lists_state_and_pid() {
    let app = build_test_app(2).await;
    post_json(
        app.app(),
        "/decision-tree/start",
        json!({ "predictionColumnName": "y", "actionColumnNames": ["x"], "numberOfValues": 1 }),
    )
    .await;

    let json = body_json(get(app.app(), "/admin/engines").await).await;

    assert_eq!(json[0]["id"], 0);
    assert_eq!(json[0]["state"], "BOOKED");
    assert_eq!(json[1]["state"], "WAITING");
    assert!(json[1]["pid"].is_u64());
    assert_eq!(json[1]["restarts"], 0);
}

#[tokio::test]
async fn requests_lists_booked_requests() {
    let app = build_test_app(1).await;
    let started = body_json(
        post_json(
            app.app(),
            "/decision-tree/start",
            json!({ "predictionColumnName": "y", "actionColumnNames": ["x"], "numberOfValues": 1 }),
        )
        .await,
    )
    .await;

    let json = body_json(get(app.app(), "/admin/requests").await).await;

    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["requestId"], started["requestId"]);
    assert_eq!(json[0]["actionName"], "decision-tree-start");
}
