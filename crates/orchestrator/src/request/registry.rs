use std::collections::HashMap;
use std::sync::Arc;

use mlsk_core::endpoint::Endpoint;
use mlsk_core::types::RequestId;
use tokio::sync::RwLock;

use super::Request;
use crate::error::OrchestratorError;

/// Request id -> bound engine, for workflows that span several calls.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct RequestRegistry {
    requests: Arc<RwLock<HashMap<RequestId, Arc<Request>>>>,
}

impl RequestRegistry {
    /// Register a freshly booked request. Ids must be unique.
    pub async fn add_request(&self, request: Request) -> Result<Arc<Request>, OrchestratorError> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id()) {
            return Err(OrchestratorError::DuplicateRequest(request.id()));
        }

        let request = Arc::new(request);
        requests.insert(request.id(), Arc::clone(&request));
        Ok(request)
    }

    pub async fn get_request(&self, request_id: RequestId) -> Option<Arc<Request>> {
        self.requests.read().await.get(&request_id).cloned()
    }

    pub async fn remove_request(&self, request_id: RequestId) -> Option<Arc<Request>> {
        self.requests.write().await.remove(&request_id)
    }

    /// Drop every request bound to `endpoint` under `up_to_generation` or an
    /// earlier generation, returning their ids in ascending order.
    pub async fn remove_requests_for(
        &self,
        endpoint: &Endpoint,
        up_to_generation: u64,
    ) -> Vec<RequestId> {
        let mut requests = self.requests.write().await;
        let mut removed: Vec<RequestId> = requests
            .iter()
            .filter(|(_, request)| {
                request.endpoint() == endpoint && request.generation() <= up_to_generation
            })
            .map(|(id, _)| *id)
            .collect();
        for id in &removed {
            requests.remove(id);
        }
        removed.sort_unstable();
        removed
    }

    /// Snapshot of all registered requests, ordered by id.
    pub async fn requests(&self) -> Vec<Arc<Request>> {
        let mut requests: Vec<_> = self.requests.read().await.values().cloned().collect();
        requests.sort_by_key(|request| request.id());
        requests
    }

    pub async fn len(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.requests.read().await.is_empty()
    }
}
