//! Requests bound to an engine across several calls.

pub mod id_generator;
pub mod registry;

use chrono::Utc;
use mlsk_core::endpoint::Endpoint;
use mlsk_core::models::admin::BookedRequest;
use mlsk_core::types::{RequestId, Timestamp};
use tokio::sync::{Mutex, MutexGuard};

/// Registry entry: which engine serves a request, and for which action it
/// was booked.
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    action_name: &'static str,
    endpoint: Endpoint,
    /// Engine generation at booking time.
    generation: u64,
    created_at: Timestamp,
    /// Serializes the calls made under this request id.
    lock: Mutex<()>,
}

impl Request {
    pub fn new(
        id: RequestId,
        action_name: &'static str,
        endpoint: Endpoint,
        generation: u64,
    ) -> Self {
        Self {
            id,
            action_name,
            endpoint,
            generation,
            created_at: Utc::now(),
            lock: Mutex::new(()),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn action_name(&self) -> &'static str {
        self.action_name
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for exclusive use of this request.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    pub fn to_booked_request(&self) -> BookedRequest {
        BookedRequest {
            request_id: self.id,
            action_name: self.action_name.to_string(),
            endpoint: self.endpoint.clone(),
            created_at: self.created_at,
        }
    }
}
