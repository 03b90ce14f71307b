//! Engine process supervision.
//!
//! [`ResilientProcess`] spawns an engine, holds it to a launch window
//! (a process that exits within the window failed to start, usually
//! because its port is taken), and afterwards watches it from a
//! dedicated task. When the process exits, the watcher posts exactly one
//! [`ProcessExit`] on the channel handed to [`ProcessSupervisor::launch`].

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use mlsk_core::endpoint::Endpoint;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;

/// Stderr lines kept for the launch failure message.
const MAX_CAPTURED_STDERR_LINES: usize = 200;

/// How long to wait for stderr to close once a process exited early.
const STDERR_GRACE: Duration = Duration::from_secs(1);

/// How long [`ResilientProcess::stop`] waits for the process to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Notification that a supervised process exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub pid: Option<u32>,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// `true` when the exit was requested through [`ProcessSupervisor::stop`].
    pub expected: bool,
}

/// Failure to bring an engine process up. Fatal for the caller.
#[derive(Debug, thiserror::Error)]
pub enum EngineCreationError {
    #[error("Failed to spawn engine {endpoint}: {source}")]
    Spawn {
        endpoint: Endpoint,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine {endpoint} exited during startup (exit code {exit_code:?}): {stderr}")]
    EarlyExit {
        endpoint: Endpoint,
        exit_code: Option<i32>,
        /// Captured standard error of the process.
        stderr: String,
    },

    #[error("Failed to wait for engine {endpoint}: {source}")]
    Wait {
        endpoint: Endpoint,
        #[source]
        source: std::io::Error,
    },
}

/// Launches and monitors the process behind one engine.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Start the process and verify it survives the launch window.
    ///
    /// On success the process is watched and its eventual exit is posted
    /// once on `exits`.
    async fn launch(
        &self,
        exits: mpsc::UnboundedSender<ProcessExit>,
    ) -> Result<(), EngineCreationError>;

    /// Whether the last launched process is still running.
    fn is_alive(&self) -> bool;

    /// OS process id of the running process.
    fn pid(&self) -> Option<u32>;

    /// Kill the running process. Its exit is reported as expected.
    async fn stop(&self);
}

/// Command line of an engine process.
#[derive(Debug, Clone)]
pub struct ProcessSettings {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Minimum lifetime of a successfully started process.
    pub launch_timeout: Duration,
}

impl ProcessSettings {
    /// `<program> <script> --port <port> --logs-path <logs>` in the engine
    /// directory.
    pub fn for_engine(config: &EngineConfig, endpoint: &Endpoint) -> Self {
        Self {
            program: config.program.clone(),
            args: vec![
                config.script.clone(),
                "--port".to_string(),
                endpoint.port.to_string(),
                "--logs-path".to_string(),
                config.logs_path.display().to_string(),
            ],
            working_dir: config.engine_path.clone(),
            launch_timeout: config.launch_timeout,
        }
    }
}

/// [`ProcessSupervisor`] backed by a real OS process.
pub struct ResilientProcess {
    endpoint: Endpoint,
    settings: ProcessSettings,
    running: Mutex<Option<RunningProcess>>,
}

struct RunningProcess {
    pid: Option<u32>,
    alive: Arc<AtomicBool>,
    stop: CancellationToken,
    watcher: JoinHandle<()>,
}

impl ResilientProcess {
    pub fn new(endpoint: Endpoint, settings: ProcessSettings) -> Self {
        Self {
            endpoint,
            settings,
            running: Mutex::new(None),
        }
    }

    fn running(&self) -> MutexGuard<'_, Option<RunningProcess>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ProcessSupervisor for ResilientProcess {
    async fn launch(
        &self,
        exits: mpsc::UnboundedSender<ProcessExit>,
    ) -> Result<(), EngineCreationError> {
        if self.is_alive() {
            tracing::warn!(engine = %self.endpoint, "Replacing a running engine process");
            self.stop().await;
        }

        let mut command = Command::new(&self.settings.program);
        command
            .args(&self.settings.args)
            .current_dir(&self.settings.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| EngineCreationError::Spawn {
            endpoint: self.endpoint.clone(),
            source,
        })?;
        let pid = child.id();
        let stderr_task = spawn_stderr_reader(child.stderr.take(), self.endpoint.clone());

        tracing::debug!(
            engine = %self.endpoint,
            pid,
            window_ms = self.settings.launch_timeout.as_millis() as u64,
            "Engine process spawned, waiting for launch window",
        );

        match tokio::time::timeout(self.settings.launch_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let stderr = tokio::time::timeout(STDERR_GRACE, stderr_task)
                    .await
                    .ok()
                    .and_then(Result::ok)
                    .unwrap_or_default()
                    .join("\n");
                Err(EngineCreationError::EarlyExit {
                    endpoint: self.endpoint.clone(),
                    exit_code: status.code(),
                    stderr,
                })
            }
            Ok(Err(source)) => Err(EngineCreationError::Wait {
                endpoint: self.endpoint.clone(),
                source,
            }),
            Err(_elapsed) => {
                let alive = Arc::new(AtomicBool::new(true));
                let stop = CancellationToken::new();
                let watcher = tokio::spawn(watch_process(
                    child,
                    self.endpoint.clone(),
                    pid,
                    Arc::clone(&alive),
                    stop.clone(),
                    exits,
                ));

                *self.running() = Some(RunningProcess {
                    pid,
                    alive,
                    stop,
                    watcher,
                });
                Ok(())
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.running()
            .as_ref()
            .is_some_and(|running| running.alive.load(Ordering::SeqCst))
    }

    fn pid(&self) -> Option<u32> {
        self.running()
            .as_ref()
            .filter(|running| running.alive.load(Ordering::SeqCst))
            .and_then(|running| running.pid)
    }

    async fn stop(&self) {
        let Some(running) = self.running().take() else {
            return;
        };

        running.stop.cancel();
        if tokio::time::timeout(STOP_TIMEOUT, running.watcher).await.is_err() {
            tracing::warn!(engine = %self.endpoint, pid = running.pid, "Engine process did not stop in time");
        }
    }
}

/// Wait for the process to exit, or kill it when `stop` fires, then
/// report the exit once.
async fn watch_process(
    mut child: Child,
    endpoint: Endpoint,
    pid: Option<u32>,
    alive: Arc<AtomicBool>,
    stop: CancellationToken,
    exits: mpsc::UnboundedSender<ProcessExit>,
) {
    let (status, expected) = tokio::select! {
        status = child.wait() => (status, false),
        () = stop.cancelled() => {
            if let Err(e) = child.start_kill() {
                tracing::warn!(engine = %endpoint, pid, error = %e, "Failed to kill engine process");
            }
            (child.wait().await, true)
        }
    };
    alive.store(false, Ordering::SeqCst);

    let exit_code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::warn!(engine = %endpoint, pid, error = %e, "Failed to read engine exit status");
            None
        }
    };
    tracing::debug!(engine = %endpoint, pid, exit_code, expected, "Engine process exited");

    let _ = exits.send(ProcessExit {
        pid,
        exit_code,
        expected,
    });
}

/// Forward stderr lines to the log, keeping the first ones for error
/// reporting. Draining continues for the whole life of the process so the
/// pipe never fills up.
fn spawn_stderr_reader(stderr: Option<ChildStderr>, endpoint: Endpoint) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut captured = Vec::new();
        let Some(stderr) = stderr else {
            return captured;
        };

        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(engine = %endpoint, "{line}");
            if captured.len() < MAX_CAPTURED_STDERR_LINES {
                captured.push(line);
            }
        }
        captured
    })
}
