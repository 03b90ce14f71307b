//! Unbound placement: first idle engine wins, no queuing, state restored.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{pool, time_series_request};
use mlsk_core::actions::{ADMIN_PING, TIME_SERIES_FORECAST, TIME_SERIES_PREDICT};
use mlsk_core::engine_state::EngineState;
use mlsk_engine::engine::EngineError;
use mlsk_engine::testing::{wait_until, FAKE_ACCURACY};
use mlsk_orchestrator::error::OrchestratorError;
use mlsk_orchestrator::orchestrator::Orchestrator;

fn states(orchestrator: &Orchestrator) -> Vec<EngineState> {
    orchestrator.engines().iter().map(|e| e.state()).collect()
}

fn spawn_forecast(
    orchestrator: &Arc<Orchestrator>,
) -> tokio::task::JoinHandle<Result<f64, OrchestratorError>> {
    let orchestrator = Arc::clone(orchestrator);
    tokio::spawn(async move {
        let request = time_series_request(0);
        orchestrator
            .run_on_engine(TIME_SERIES_FORECAST, move |engine| async move {
                engine.compute_forecast_accuracy(&request).await
            })
            .await
    })
}

// ---------------------------------------------------------------------------
// Pool order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_on_engine_uses_first_waiting_engine_only() {
    let pool = pool(2).await;
    for api in &pool.apis {
        api.hold_calls();
    }

    let task = spawn_forecast(&pool.orchestrator);
    wait_until("call in flight", || pool.apis[0].in_flight() == 1).await;

    assert_eq!(
        states(&pool.orchestrator),
        vec![EngineState::Computing, EngineState::Waiting]
    );
    assert_eq!(pool.apis[1].calls(), 0);

    pool.apis[0].release(1);
    assert_eq!(task.await.unwrap().unwrap(), FAKE_ACCURACY);
    assert_eq!(
        states(&pool.orchestrator),
        vec![EngineState::Waiting, EngineState::Waiting]
    );
}

#[tokio::test]
async fn idle_pool_always_picks_the_first_engine() {
    let pool = pool(3).await;
    let request = time_series_request(0);

    for _ in 0..3 {
        let request = request.clone();
        pool.orchestrator
            .run_on_engine(TIME_SERIES_PREDICT, move |engine| async move {
                engine.predict(&request).await
            })
            .await
            .unwrap();
    }

    assert_eq!(pool.apis[0].calls(), 3);
    assert_eq!(pool.apis[1].calls(), 0);
    assert_eq!(pool.apis[2].calls(), 0);
}

// ---------------------------------------------------------------------------
// Mutual exclusion and admission
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_placements_land_on_distinct_engines() {
    let pool = pool(3).await;
    for api in &pool.apis {
        api.hold_calls();
    }

    let tasks: Vec<_> = (0..3).map(|_| spawn_forecast(&pool.orchestrator)).collect();
    wait_until("every engine busy", || {
        pool.apis.iter().all(|api| api.in_flight() == 1)
    })
    .await;

    for api in &pool.apis {
        assert_eq!(api.calls(), 1, "an engine received two placements");
    }
    assert!(states(&pool.orchestrator)
        .iter()
        .all(|state| *state == EngineState::Computing));

    for api in &pool.apis {
        api.release(1);
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert!(states(&pool.orchestrator)
        .iter()
        .all(|state| *state == EngineState::Waiting));
}

#[tokio::test]
async fn busy_pool_rejects_immediately() {
    let pool = pool(2).await;
    for api in &pool.apis {
        api.hold_calls();
    }
    let tasks: Vec<_> = (0..2).map(|_| spawn_forecast(&pool.orchestrator)).collect();
    wait_until("every engine busy", || {
        pool.apis.iter().all(|api| api.in_flight() == 1)
    })
    .await;

    let request = time_series_request(0);
    let rejected = tokio::time::timeout(
        Duration::from_millis(200),
        pool.orchestrator
            .run_on_engine(TIME_SERIES_FORECAST, move |engine| async move {
                engine.forecast(&request).await
            }),
    )
    .await
    .expect("admission rejection must not wait for a busy engine");

    assert_matches!(
        rejected,
        Err(OrchestratorError::NoAvailableEngine(TIME_SERIES_FORECAST))
    );
    assert_eq!(
        rejected.unwrap_err().to_string(),
        "No available engine to run time-series-forecast, please try again later"
    );

    for api in &pool.apis {
        api.release(1);
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn pool_of_off_engines_rejects() {
    let pool = common::unlaunched_pool(2);

    let result = pool
        .orchestrator
        .run_on_engine(TIME_SERIES_FORECAST, |engine| async move {
            engine.forecast(&time_series_request(0)).await
        })
        .await;

    assert_matches!(result, Err(OrchestratorError::NoAvailableEngine(_)));
}

// ---------------------------------------------------------------------------
// State restoration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_call_returns_engine_to_waiting() {
    let pool = pool(1).await;
    pool.apis[0].fail_calls(true);

    let err = pool
        .orchestrator
        .run_on_engine(TIME_SERIES_FORECAST, |engine| async move {
            engine.forecast(&time_series_request(0)).await
        })
        .await
        .unwrap_err();

    assert_matches!(err, OrchestratorError::Engine(EngineError::Request(_)));
    assert!(err
        .to_string()
        .starts_with("Failed on call forecast to engine"));
    assert_eq!(states(&pool.orchestrator), vec![EngineState::Waiting]);
    assert!(pool.orchestrator.registry().is_empty().await);
}

#[tokio::test]
async fn successful_call_leaves_no_binding_behind() {
    let pool = pool(1).await;

    pool.orchestrator
        .run_on_engine(TIME_SERIES_FORECAST, |engine| async move {
            engine.forecast(&time_series_request(0)).await
        })
        .await
        .unwrap();

    assert_eq!(states(&pool.orchestrator), vec![EngineState::Waiting]);
    assert!(pool.orchestrator.booked_requests().await.is_empty());
}

// ---------------------------------------------------------------------------
// Priority runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn priority_run_reaches_a_busy_engine() {
    let pool = pool(1).await;
    pool.apis[0].hold_calls();
    let task = spawn_forecast(&pool.orchestrator);
    wait_until("call in flight", || pool.apis[0].in_flight() == 1).await;

    let detail = pool
        .orchestrator
        .priority_run_on_engine(0, ADMIN_PING, |engine| async move { engine.ping().await })
        .await
        .unwrap();

    assert_eq!(detail.processes_details.len(), 1);
    assert_eq!(states(&pool.orchestrator), vec![EngineState::Computing]);

    pool.apis[0].release(1);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn priority_run_on_unknown_engine_fails() {
    let pool = pool(2).await;

    let err = pool
        .orchestrator
        .priority_run_on_engine(5, ADMIN_PING, |engine| async move { engine.ping().await })
        .await
        .unwrap_err();

    assert_matches!(
        err,
        OrchestratorError::NoEngineWithId {
            engine_id: 5,
            action: ADMIN_PING
        }
    );
}

#[tokio::test]
async fn priority_run_on_all_engines_keeps_pool_order() {
    let pool = pool(3).await;

    let endpoints = pool
        .orchestrator
        .priority_run_on_all_engines(ADMIN_PING, |engine| async move {
            engine.ping().await.map(|_| engine.endpoint().port)
        })
        .await
        .unwrap();

    assert_eq!(endpoints, vec![6767, 6768, 6769]);
}

#[tokio::test]
async fn priority_run_on_all_engines_fails_when_one_engine_fails() {
    let pool = pool(2).await;
    pool.apis[1].fail_calls(true);

    let result = pool
        .orchestrator
        .priority_run_on_all_engines(ADMIN_PING, |engine| async move { engine.ping().await })
        .await;

    assert_matches!(result, Err(OrchestratorError::Engine(EngineError::Request(_))));
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn launch_engines_stops_at_first_failure() {
    let pool = common::unlaunched_pool(3);
    pool.processes[1].fail_next_launch("port in use");

    let err = pool.orchestrator.launch_engines().await.unwrap_err();

    assert_matches!(err, OrchestratorError::EngineCreation(_));
    assert!(err.to_string().contains("port in use"));
    assert_eq!(pool.processes[0].launches(), 1);
    assert_eq!(pool.processes[1].launches(), 1);
    assert_eq!(pool.processes[2].launches(), 0, "startup must abort at the first failure");
    assert_eq!(
        states(&pool.orchestrator),
        vec![EngineState::Waiting, EngineState::Off, EngineState::Off]
    );
}
