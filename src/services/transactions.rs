use bigdecimal::BigDecimal;
use tracing::info;

use crate::database::models::{NewTransaction, Transaction, TransactionStatus, TransactionType};
use crate::database::repository::SharedStore;
use crate::error::{AppError, AppErrorKind, AppResult, ValidationError};

pub struct TransactionService {
    store: SharedStore,
}

impl TransactionService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The user's history, newest first.
    pub async fn list(&self, user_id: i64) -> AppResult<Vec<Transaction>> {
        Ok(self.store.list_transactions(user_id).await?)
    }

    /// Record a pending deposit or withdrawal. Balances are untouched until the
    /// movement is confirmed elsewhere.
    pub async fn record_pending(
        &self,
        user_id: i64,
        kind: TransactionType,
        amount: BigDecimal,
    ) -> AppResult<Transaction> {
        if amount <= BigDecimal::from(0) {
            return Err(AppError::new(AppErrorKind::Validation(
                ValidationError::InvalidAmount {
                    amount: amount.to_string(),
                    reason: "must be greater than zero".to_string(),
                },
            )));
        }

        let tx = self
            .store
            .create_transaction(NewTransaction {
                user_id,
                kind,
                amount,
                status: TransactionStatus::Pending,
            })
            .await?;
        info!(user_id, transaction_id = tx.id, kind = %tx.kind, amount = %tx.amount, "transaction recorded");
        Ok(tx)
    }
}
