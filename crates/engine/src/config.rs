//! Engine pool configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mlsk_core::endpoint::Endpoint;

/// Configuration errors raised while reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// How to launch and reach the pooled engines.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Host every engine listens on (default: `localhost`).
    pub host: String,
    /// One engine is started per port, in this order.
    pub ports: Vec<u16>,
    /// Working directory of the engine processes.
    pub engine_path: PathBuf,
    /// Directory passed to the engines as `--logs-path`.
    pub logs_path: PathBuf,
    /// Interpreter or binary to run (default: `python3`).
    pub program: String,
    /// Entry script passed as first argument (default: `engine_server.py`).
    pub script: String,
    /// How long a freshly spawned engine must stay alive to count as started.
    pub launch_timeout: Duration,
    /// Timeout applied to every HTTP call made to an engine.
    pub request_timeout: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                       | Default            |
    /// |-------------------------------|--------------------|
    /// | `ENGINE_PORTS`                | required           |
    /// | `ENGINE_HOST`                 | `localhost`        |
    /// | `ENGINE_PATH`                 | required           |
    /// | `ENGINE_LOGS_PATH`            | required           |
    /// | `ENGINE_PROGRAM`              | `python3`          |
    /// | `ENGINE_SCRIPT`               | `engine_server.py` |
    /// | `ENGINE_LAUNCH_TIMEOUT_MS`    | `3000`             |
    /// | `ENGINE_REQUEST_TIMEOUT_SECS` | `600`              |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let ports = parse_ports(&required(&lookup, "ENGINE_PORTS")?)?;

        let launch_timeout_ms: u64 = parse_or(&lookup, "ENGINE_LAUNCH_TIMEOUT_MS", 3000)?;
        let request_timeout_secs: u64 = parse_or(&lookup, "ENGINE_REQUEST_TIMEOUT_SECS", 600)?;

        Ok(Self {
            host: lookup("ENGINE_HOST").unwrap_or_else(|| "localhost".into()),
            ports,
            engine_path: required(&lookup, "ENGINE_PATH")?.into(),
            logs_path: required(&lookup, "ENGINE_LOGS_PATH")?.into(),
            program: lookup("ENGINE_PROGRAM").unwrap_or_else(|| "python3".into()),
            script: lookup("ENGINE_SCRIPT").unwrap_or_else(|| "engine_server.py".into()),
            launch_timeout: Duration::from_millis(launch_timeout_ms),
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }

    /// Endpoints of the pool, in configured order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.ports
            .iter()
            .map(|port| Endpoint::new(self.host.clone(), *port))
            .collect()
    }
}

/// Read a variable that has no default.
pub fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<String, ConfigError> {
    lookup(var)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

/// Parse a variable, falling back to `default` when it is unset.
pub fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_ports(raw: &str) -> Result<Vec<u16>, ConfigError> {
    let mut ports = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let port: u16 = part.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
            var: "ENGINE_PORTS",
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
        if ports.contains(&port) {
            return Err(ConfigError::Invalid {
                var: "ENGINE_PORTS",
                value: raw.to_string(),
                reason: format!("port {port} is listed twice"),
            });
        }
        ports.push(port);
    }

    if ports.is_empty() {
        return Err(ConfigError::Missing("ENGINE_PORTS"));
    }
    Ok(ports)
}
