//! Network location of a computation engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed `(host, port)` pair an engine process listens on.
///
/// An endpoint is the identity of a worker handle: it never changes for
/// the lifetime of the service, even across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base HTTP URL of the engine API, e.g. `http://localhost:6767`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
