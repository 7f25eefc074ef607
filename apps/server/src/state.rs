//! Shared application state

use crate::{
    config::{Config, StorageBackend},
    db::Stores,
    services::{Clock, Services, SystemClock},
    session::SessionManager,
    Result,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppStateOptions {
    pub run_migrations: bool,
    /// Time source for registration windows.
    pub clock: Arc<dyn Clock>,
}

impl Default for AppStateOptions {
    fn default() -> Self {
        Self {
            run_migrations: true,
            clock: Arc::new(SystemClock),
        }
    }
}

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<SessionManager>,
    pub services: Services,
    /// `None` with the in-memory backend.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Initialize the application state
    pub async fn new(config: Config) -> Result<Self> {
        let options = AppStateOptions {
            run_migrations: config.database.run_migrations,
            ..AppStateOptions::default()
        };
        Self::new_with_options(config, options).await
    }

    pub async fn new_with_options(config: Config, options: AppStateOptions) -> Result<Self> {
        tracing::info!(backend = ?config.storage.backend, "Initializing application state...");

        let (stores, db_pool) = match config.storage.backend {
            StorageBackend::Postgres => {
                let pool = create_db_pool(&config).await?;

                if options.run_migrations {
                    tracing::info!("Running database migrations...");
                    sqlx::migrate!("./migrations")
                        .run(&pool)
                        .await
                        .map_err(|e| crate::Error::Internal(format!("Migration failed: {}", e)))?;
                }

                (Stores::postgres(pool.clone()), Some(pool))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                (Stores::memory(), None)
            }
        };

        let state = Self::from_parts(config, stores, options.clock, db_pool);
        tracing::info!("Application state initialized successfully");
        Ok(state)
    }

    /// Wire state around already-built stores (tests, embedding).
    pub fn with_stores(config: Config, stores: Stores, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(config, stores, clock, None)
    }

    fn from_parts(
        config: Config,
        stores: Stores,
        clock: Arc<dyn Clock>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(&config.auth));
        Self {
            config: Arc::new(config),
            session,
            services: Services::new(stores, clock),
            db_pool,
        }
    }

    /// Pagination bounds from configuration.
    pub fn pagination(&self, limit: Option<i64>, page: Option<i64>) -> crate::models::Pagination {
        crate::models::Pagination::with_bounds(
            limit,
            page,
            self.config.pagination.default_limit,
            self.config.pagination.max_limit,
        )
    }
}

async fn create_db_pool(config: &Config) -> Result<PgPool> {
    tracing::info!("Creating database connection pool...");

    let statement_timeout = config.database.statement_timeout_seconds;
    let lock_timeout = config.database.lock_timeout_seconds;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .min_connections(config.database.pool_min_size)
        .max_connections(config.database.pool_max_size)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database.pool_timeout_seconds,
        ))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query(&format!("SET statement_timeout = '{}s'", statement_timeout))
                    .execute(&mut *conn)
                    .await?;

                // Fail fast instead of queueing behind a long lock.
                sqlx::query(&format!("SET lock_timeout = '{}s'", lock_timeout))
                    .execute(&mut *conn)
                    .await?;

                Ok(())
            })
        })
        .connect(&config.database.url)
        .await
        .map_err(crate::Error::Database)?;

    tracing::info!(
        "Database pool created (min: {}, max: {})",
        config.database.pool_min_size,
        config.database.pool_max_size
    );

    Ok(pool)
}
