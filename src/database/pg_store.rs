use crate::database::error::DatabaseError;
use crate::database::repository::{RepoResult, StoreHealth};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

/// PostgreSQL-backed store. Entity queries live in the `*_repository` modules.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> RepoResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx(e.into()))?;
        info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> RepoResult<()> {
        super::health_check(&self.pool).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
