use crate::database::error::DatabaseError;
use crate::database::models::{
    CreditOutcome, DepositCredit, NewPaymentOrder, PaymentOrderRecord, TransactionStatus,
};
use crate::database::pg_store::PgStore;
use crate::database::repository::{LedgerRepository, PaymentOrderRepository, RepoResult};
use async_trait::async_trait;
use sqlx::types::BigDecimal;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
struct PaymentOrderRow {
    order_id: String,
    user_id: i64,
    transaction_id: Option<i64>,
    amount: BigDecimal,
    currency: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<PaymentOrderRow> for PaymentOrderRecord {
    fn from(row: PaymentOrderRow) -> Self {
        PaymentOrderRecord {
            order_id: row.order_id,
            user_id: row.user_id,
            transaction_id: row.transaction_id,
            amount: row.amount,
            currency: row.currency,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl PaymentOrderRepository for PgStore {
    async fn record_payment_order(
        &self,
        order: NewPaymentOrder,
    ) -> RepoResult<PaymentOrderRecord> {
        sqlx::query_as::<_, PaymentOrderRow>(
            "INSERT INTO payment_orders (order_id, user_id, transaction_id, amount, currency)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING order_id, user_id, transaction_id, amount, currency, created_at",
        )
        .bind(&order.order_id)
        .bind(order.user_id)
        .bind(order.transaction_id)
        .bind(&order.amount)
        .bind(&order.currency)
        .fetch_one(&self.pool)
        .await
        .map(PaymentOrderRecord::from)
        .map_err(DatabaseError::from_sqlx)
    }

    async fn find_payment_order(&self, order_id: &str) -> RepoResult<Option<PaymentOrderRecord>> {
        sqlx::query_as::<_, PaymentOrderRow>(
            "SELECT order_id, user_id, transaction_id, amount, currency, created_at
             FROM payment_orders WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(PaymentOrderRecord::from))
        .map_err(DatabaseError::from_sqlx)
    }
}

#[async_trait]
impl LedgerRepository for PgStore {
    async fn credit_deposit(&self, credit: DepositCredit) -> RepoResult<CreditOutcome> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        // The primary key on processed_orders serializes concurrent deliveries:
        // the loser blocks until the winner commits, then inserts nothing.
        let claimed = sqlx::query(
            "INSERT INTO processed_orders (order_id, user_id, amount)
             VALUES ($1, $2, $3)
             ON CONFLICT (order_id) DO NOTHING",
        )
        .bind(&credit.order_id)
        .bind(credit.user_id)
        .bind(&credit.amount)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
            return Ok(CreditOutcome::AlreadyProcessed);
        }

        let updated: Option<(BigDecimal, BigDecimal)> = sqlx::query_as(
            "UPDATE users
             SET balance = balance + $2, total_deposits = total_deposits + $2
             WHERE id = $1
             RETURNING balance, total_deposits",
        )
        .bind(credit.user_id)
        .bind(&credit.amount)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let Some((new_balance, new_total_deposits)) = updated else {
            tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
            return Ok(CreditOutcome::UnknownUser);
        };

        if let Some(transaction_id) = credit.transaction_id {
            sqlx::query("UPDATE transactions SET status = $2 WHERE id = $1")
                .bind(transaction_id)
                .bind(TransactionStatus::Completed.as_str())
                .execute(&mut *tx)
                .await
                .map_err(DatabaseError::from_sqlx)?;
        }

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        Ok(CreditOutcome::Credited {
            user_id: credit.user_id,
            new_balance,
            new_total_deposits,
        })
    }

    async fn is_order_processed(&self, order_id: &str) -> RepoResult<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT order_id FROM processed_orders WHERE order_id = $1")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::from_sqlx)?;
        Ok(row.is_some())
    }
}
