//! Application state for ticket-server

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::{BoxError, PgStore};
use crate::ordering::{CoordinatorConfig, ReorderCoordinator};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool (response reads)
    pub pool: PgPool,
    /// All ordered-collection mutations go through here
    pub coordinator: Arc<ReorderCoordinator<PgStore>>,
    /// JWT secret for user authentication
    pub jwt_secret: String,
    /// Cancelled on shutdown; in-flight reorders roll back instead of
    /// holding up the drain. A dropped request future rolls back on its own
    /// since its transaction drops with it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub async fn new(config: &Config, shutdown: CancellationToken) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await?;
        tracing::info!("Connected to PostgreSQL");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let coordinator = ReorderCoordinator::new(
            PgStore::new(pool.clone()),
            CoordinatorConfig {
                fanout_limit: config.reorder_fanout_limit,
                timeout: config.reorder_timeout,
            },
        );

        Ok(Self {
            pool,
            coordinator: Arc::new(coordinator),
            jwt_secret: config.jwt_secret.clone(),
            shutdown,
        })
    }
}
