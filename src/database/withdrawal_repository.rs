use crate::database::error::DatabaseError;
use crate::database::models::{
    NewTransaction, NewWithdrawalRequest, TransactionStatus, TransactionType, WithdrawalDecision,
    WithdrawalOutcome, WithdrawalRequest, WithdrawalStatus,
};
use crate::database::pg_store::PgStore;
use crate::database::repository::{RepoResult, WithdrawalRepository};
use crate::database::transaction_repository::insert_transaction;
use async_trait::async_trait;
use sqlx::types::BigDecimal;
use sqlx::FromRow;
use tracing::info;

#[derive(Debug, Clone, FromRow)]
struct WithdrawalRow {
    id: i64,
    user_id: i64,
    amount: BigDecimal,
    withdrawal_address: String,
    status: String,
    admin_notes: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    processed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<WithdrawalRow> for WithdrawalRequest {
    type Error = DatabaseError;

    fn try_from(row: WithdrawalRow) -> Result<Self, Self::Error> {
        Ok(WithdrawalRequest {
            id: row.id,
            user_id: row.user_id,
            amount: row.amount,
            withdrawal_address: row.withdrawal_address,
            status: row.status.parse()?,
            admin_notes: row.admin_notes,
            created_at: row.created_at,
            processed_at: row.processed_at,
        })
    }
}

const WITHDRAWAL_COLUMNS: &str =
    "id, user_id, amount, withdrawal_address, status, admin_notes, created_at, processed_at";

fn into_requests(rows: Vec<WithdrawalRow>) -> RepoResult<Vec<WithdrawalRequest>> {
    rows.into_iter().map(WithdrawalRequest::try_from).collect()
}

#[async_trait]
impl WithdrawalRepository for PgStore {
    async fn create_withdrawal_request(
        &self,
        request: NewWithdrawalRequest,
    ) -> RepoResult<WithdrawalRequest> {
        let sql = format!(
            "INSERT INTO withdrawal_requests (user_id, amount, withdrawal_address, status)
             VALUES ($1, $2, $3, 'pending')
             RETURNING {}",
            WITHDRAWAL_COLUMNS
        );
        sqlx::query_as::<_, WithdrawalRow>(&sql)
            .bind(request.user_id)
            .bind(&request.amount)
            .bind(&request.withdrawal_address)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?
            .try_into()
    }

    async fn list_withdrawal_requests(&self, user_id: i64) -> RepoResult<Vec<WithdrawalRequest>> {
        let sql = format!(
            "SELECT {} FROM withdrawal_requests WHERE user_id = $1
             ORDER BY created_at DESC, id DESC",
            WITHDRAWAL_COLUMNS
        );
        let rows = sqlx::query_as::<_, WithdrawalRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        into_requests(rows)
    }

    async fn list_all_withdrawal_requests(&self) -> RepoResult<Vec<WithdrawalRequest>> {
        let sql = format!(
            "SELECT {} FROM withdrawal_requests ORDER BY created_at DESC, id DESC",
            WITHDRAWAL_COLUMNS
        );
        let rows = sqlx::query_as::<_, WithdrawalRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        into_requests(rows)
    }

    async fn process_withdrawal(
        &self,
        withdrawal_id: i64,
        decision: WithdrawalDecision,
    ) -> RepoResult<WithdrawalOutcome> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let lock_sql = format!(
            "SELECT {} FROM withdrawal_requests WHERE id = $1 FOR UPDATE",
            WITHDRAWAL_COLUMNS
        );
        let current: WithdrawalRequest =
            match sqlx::query_as::<_, WithdrawalRow>(&lock_sql)
                .bind(withdrawal_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DatabaseError::from_sqlx)?
            {
                Some(row) => row.try_into()?,
                None => {
                    tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
                    return Ok(WithdrawalOutcome::NotFound);
                }
            };

        if current.status != WithdrawalStatus::Pending {
            tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
            return Ok(WithdrawalOutcome::AlreadyProcessed(current.status));
        }

        let new_status = if decision.approve {
            // The balance guard lives in the WHERE clause so the debit can never go negative.
            let debited: Option<(BigDecimal,)> = sqlx::query_as(
                "UPDATE users
                 SET balance = balance - $2, total_withdrawn = total_withdrawn + $2
                 WHERE id = $1 AND balance >= $2
                 RETURNING balance",
            )
            .bind(current.user_id)
            .bind(&current.amount)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DatabaseError::from_sqlx)?;

            if debited.is_none() {
                let available: Option<(BigDecimal,)> =
                    sqlx::query_as("SELECT balance FROM users WHERE id = $1")
                        .bind(current.user_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(DatabaseError::from_sqlx)?;
                tx.rollback().await.map_err(DatabaseError::from_sqlx)?;
                return match available {
                    Some((available,)) => Ok(WithdrawalOutcome::InsufficientBalance {
                        available,
                        required: current.amount,
                    }),
                    None => Err(DatabaseError::not_found("User", current.user_id)),
                };
            }

            insert_transaction(
                &mut *tx,
                &NewTransaction {
                    user_id: current.user_id,
                    kind: TransactionType::Withdrawal,
                    amount: current.amount.clone(),
                    status: TransactionStatus::Completed,
                },
            )
            .await?;

            WithdrawalStatus::Approved
        } else {
            WithdrawalStatus::Rejected
        };

        let update_sql = format!(
            "UPDATE withdrawal_requests
             SET status = $2, admin_notes = $3, processed_at = NOW()
             WHERE id = $1
             RETURNING {}",
            WITHDRAWAL_COLUMNS
        );
        let updated: WithdrawalRequest = sqlx::query_as::<_, WithdrawalRow>(&update_sql)
            .bind(withdrawal_id)
            .bind(new_status.as_str())
            .bind(&decision.admin_notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::from_sqlx)?
            .try_into()?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            withdrawal_id,
            user_id = updated.user_id,
            status = %updated.status,
            "withdrawal request processed"
        );
        Ok(WithdrawalOutcome::Processed(updated))
    }
}
