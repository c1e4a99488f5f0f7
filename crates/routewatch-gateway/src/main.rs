//! routewatch gateway binary.
//!
//! - Config: first CLI argument, else `routewatch.yaml` if present, else defaults
//! - Instrumented demo routes: `/`, `/slow`, `/error`
//! - Scrape endpoint on the same listener (default `/metrics`)
//! - Ctrl-C drains and shuts down gracefully

use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use routewatch_core::error::{Result, RouteWatchError};
use routewatch_gateway::config::{self, RouteWatchConfig, DEFAULT_CONFIG_PATH};
use routewatch_gateway::{app_state::AppState, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "routewatch-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = load_config()?;
    let listen = cfg.server.listen_addr()?;

    let state = AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(
        %listen,
        metrics_path = %state.cfg().metrics.path,
        "routewatch-gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| RouteWatchError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| RouteWatchError::Internal(format!("server failed: {e}")))?;

    tracing::info!("routewatch-gateway stopped");
    Ok(())
}

fn load_config() -> Result<RouteWatchConfig> {
    if let Some(path) = std::env::args().nth(1) {
        return config::load_from_file(&path);
    }
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return config::load_from_file(DEFAULT_CONFIG_PATH);
    }
    tracing::info!("no config file, using defaults");
    Ok(RouteWatchConfig::default())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    state.set_draining();
    tracing::info!("shutdown requested, draining");
}
