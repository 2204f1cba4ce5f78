pub mod error;
pub mod memory;
pub mod models;
pub mod payment_order_repository;
pub mod pg_store;
pub mod repository;
pub mod task_repository;
pub mod transaction_repository;
pub mod user_repository;
pub mod withdrawal_repository;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error as log_error, info, warn};

use self::error::DatabaseError;
use self::memory::MemoryStore;
use self::pg_store::PgStore;
use self::repository::SharedStore;
use crate::config::{DatabaseConfig, StorageBackend, StorageConfig};

/// Database pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 5,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connection_timeout: Duration::from_secs(config.connection_timeout),
            idle_timeout: Duration::from_secs(config.idle_timeout.unwrap_or(600)),
            ..Self::default()
        }
    }
}

/// Initialize the database connection pool
pub async fn init_pool(
    database_url: &str,
    config: Option<PoolConfig>,
) -> Result<PgPool, DatabaseError> {
    let config = config.unwrap_or_default();

    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connection_timeout = ?config.connection_timeout,
        "Initializing database pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connection_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(database_url)
        .await
        .map_err(|e| {
            log_error!("Failed to initialize database pool: {}", e);
            DatabaseError::from_sqlx(e)
        })?;

    pool.acquire().await.map_err(|e| {
        log_error!("Failed to acquire test connection: {}", e);
        DatabaseError::from_sqlx(e)
    })?;

    info!("Database pool initialized successfully");
    Ok(pool)
}

/// Connection pool health check
pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!("Health check failed: {}", e);
        DatabaseError::from_sqlx(e)
    })?;

    Ok(())
}

/// Build the configured store. Postgres stores are migrated before use.
pub async fn init_store(config: &StorageConfig) -> Result<SharedStore, DatabaseError> {
    match (config.backend, &config.database) {
        (StorageBackend::Memory, _) => {
            warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        (StorageBackend::Postgres, Some(database)) => {
            let pool = init_pool(&database.url, Some(PoolConfig::from(database))).await?;
            let store = PgStore::new(pool);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        (StorageBackend::Postgres, None) => Err(DatabaseError::new(
            error::DatabaseErrorKind::Connection {
                message: "DATABASE_URL is required for the postgres backend".to_string(),
            },
        )),
    }
}
