pub mod api;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod utils;

use anyhow::{Context, Result};
use log::info;

use api::AppState;
use config::Config;
use db::Database;
use lifecycle::SessionController;

/// Open the store and wire the lifecycle engine into an [`AppState`].
pub fn build_state(config: &Config) -> Result<AppState> {
    let database = Database::new(config.database_path.clone())?;
    let sessions = SessionController::new(database, config.lifecycle.clone());
    Ok(AppState { sessions })
}

/// Serve the API until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    utils::logging::init(&config.log_level);

    info!("DeepWork starting up...");
    info!(
        "Interruption limit {}, overdue tolerance {:.0}%",
        config.lifecycle.interruption_limit,
        config.lifecycle.overdue_tolerance * 100.0
    );

    let state = build_state(&config)?;
    let app = api::router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("DeepWork shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
