use std::sync::atomic::{AtomicU64, Ordering};

use mlsk_core::types::RequestId;

/// First id handed out.
const FIRST_REQUEST_ID: RequestId = 1;

/// Monotonic source of request ids. One instance per orchestrator.
#[derive(Debug)]
pub struct RequestIdGenerator {
    next: AtomicU64,
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(FIRST_REQUEST_ID),
        }
    }
}

impl RequestIdGenerator {
    pub fn next_id(&self) -> RequestId {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn reset(&self) {
        self.next.store(FIRST_REQUEST_ID, Ordering::SeqCst);
    }
}
