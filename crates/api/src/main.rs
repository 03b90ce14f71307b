use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use mlsk_api::config::ServerConfig;
use mlsk_api::router::build_app_router;
use mlsk_api::state::AppState;
use mlsk_engine::config::{ConfigError, EngineConfig};
use mlsk_orchestrator::error::OrchestratorError;
use mlsk_orchestrator::orchestrator::Orchestrator;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Failures that prevent the service from starting.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid HOST address '{0}'")]
    Host(String),

    #[error("Failed to build engine HTTP client: {0}")]
    HttpClient(String),

    #[error("Failed to launch engines: {0}")]
    Engines(#[from] OrchestratorError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mlsk_api=debug,mlsk_orchestrator=info,mlsk_engine=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Service stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    let engine_config = EngineConfig::from_env()?;
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");
    tracing::info!(
        ports = ?engine_config.ports,
        engine_path = %engine_config.engine_path.display(),
        "Loaded engine configuration",
    );

    let host: IpAddr = config
        .host
        .parse()
        .map_err(|_| StartupError::Host(config.host.clone()))?;
    let addr = SocketAddr::new(host, config.port);

    // --- Engine pool ---
    let cancel = CancellationToken::new();
    let engines = mlsk_engine::engine::pool_from_config(&engine_config, &cancel)
        .map_err(|e| StartupError::HttpClient(e.to_string()))?;
    let orchestrator = Arc::new(Orchestrator::new(engines, cancel.clone()));

    if let Err(e) = orchestrator.launch_engines().await {
        orchestrator.shutdown().await;
        return Err(e.into());
    }

    // --- App state ---
    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let served = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await,
        Err(e) => Err(e),
    };

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    orchestrator.shutdown().await;
    cancel.cancel();
    tracing::info!("Graceful shutdown complete");

    Ok(served?)
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
