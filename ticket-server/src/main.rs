//! ticket-server: kanban board service
//!
//! Long-running HTTP service that:
//! - Serves boards, statuses and tickets of authenticated users (JWT)
//! - Keeps the `sort_order` of every sibling set contiguous under
//!   concurrent moves and reorders
//! - Stores everything in PostgreSQL

mod api;
mod auth;
mod config;
mod db;
mod error;
mod ordering;
mod state;
mod utils;

use config::Config;
use db::BoxError;
use state::AppState;
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ticket_server=info,tower_http=info".into());

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = Config::from_env()?;

    tracing::info!("Starting ticket-server (env: {})", config.environment);

    let shutdown = CancellationToken::new();
    let state = AppState::new(&config, shutdown.clone()).await?;
    let app = api::create_router(state, config.request_timeout);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("ticket-server HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("ticket-server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
