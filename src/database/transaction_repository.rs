use crate::database::error::DatabaseError;
use crate::database::models::{NewTransaction, Transaction, TransactionStatus};
use crate::database::pg_store::PgStore;
use crate::database::repository::{RepoResult, TransactionRepository};
use async_trait::async_trait;
use sqlx::types::BigDecimal;
use sqlx::{FromRow, Postgres};

/// Transaction row as stored; `type` and `status` are text columns.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct TransactionRow {
    pub id: i64,
    pub user_id: i64,
    pub r#type: String,
    pub amount: BigDecimal,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DatabaseError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            user_id: row.user_id,
            kind: row.r#type.parse()?,
            amount: row.amount,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

/// Insert a transaction using any executor, so ledger code can reuse it inside a DB transaction.
pub(crate) async fn insert_transaction<'e, E>(
    executor: E,
    tx: &NewTransaction,
) -> RepoResult<Transaction>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, TransactionRow>(
        "INSERT INTO transactions (user_id, type, amount, status)
         VALUES ($1, $2, $3, $4)
         RETURNING id, user_id, type, amount, status, created_at",
    )
    .bind(tx.user_id)
    .bind(tx.kind.as_str())
    .bind(&tx.amount)
    .bind(tx.status.as_str())
    .fetch_one(executor)
    .await
    .map_err(DatabaseError::from_sqlx)?
    .try_into()
}

#[async_trait]
impl TransactionRepository for PgStore {
    async fn create_transaction(&self, tx: NewTransaction) -> RepoResult<Transaction> {
        insert_transaction(&self.pool, &tx).await
    }

    async fn list_transactions(&self, user_id: i64) -> RepoResult<Vec<Transaction>> {
        sqlx::query_as::<_, TransactionRow>(
            "SELECT id, user_id, type, amount, status, created_at
             FROM transactions
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .into_iter()
        .map(Transaction::try_from)
        .collect()
    }

    async fn update_transaction_status(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> RepoResult<Option<Transaction>> {
        sqlx::query_as::<_, TransactionRow>(
            "UPDATE transactions
             SET status = $2
             WHERE id = $1
             RETURNING id, user_id, type, amount, status, created_at",
        )
        .bind(transaction_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .map(Transaction::try_from)
        .transpose()
    }
}
