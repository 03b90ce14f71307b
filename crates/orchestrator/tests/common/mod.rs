use std::sync::Arc;

use mlsk_core::models::time_series::{TimeSeries, TimeSeriesAnalysisRequest, TimeSeriesRow};
use mlsk_core::types::RequestId;
use mlsk_engine::testing::{fake_engine, FakeEngineApi, FakeProcess};
use mlsk_orchestrator::orchestrator::Orchestrator;
use tokio_util::sync::CancellationToken;

/// First engine port of a test pool; engine `i` listens on `BASE_PORT + i`.
pub const BASE_PORT: u16 = 6767;

/// An orchestrator over fake engines, with handles on the fakes.
pub struct TestPool {
    pub orchestrator: Arc<Orchestrator>,
    pub processes: Vec<Arc<FakeProcess>>,
    pub apis: Vec<Arc<FakeEngineApi>>,
}

/// Build a pool of `size` fake engines, all still `OFF`.
pub fn unlaunched_pool(size: usize) -> TestPool {
    let mut engines = Vec::with_capacity(size);
    let mut processes = Vec::with_capacity(size);
    let mut apis = Vec::with_capacity(size);

    for i in 0..size {
        let (engine, process, api) = fake_engine(BASE_PORT + i as u16);
        engines.push(engine);
        processes.push(process);
        apis.push(api);
    }

    TestPool {
        orchestrator: Arc::new(Orchestrator::new(engines, CancellationToken::new())),
        processes,
        apis,
    }
}

/// Build a pool of `size` fake engines, all launched and `WAITING`.
pub async fn pool(size: usize) -> TestPool {
    let pool = unlaunched_pool(size);
    pool.orchestrator.launch_engines().await.unwrap();
    pool
}

pub fn time_series_request(request_id: RequestId) -> TimeSeriesAnalysisRequest {
    TimeSeriesAnalysisRequest::new(
        request_id,
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
        },
        1,
    )
}
