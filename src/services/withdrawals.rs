//! Withdrawal requests and their admin review.

use bigdecimal::BigDecimal;
use tracing::{info, warn};

use crate::database::models::{
    NewWithdrawalRequest, WithdrawalDecision, WithdrawalOutcome, WithdrawalRequest,
    WithdrawalStatus,
};
use crate::database::repository::SharedStore;
use crate::error::{AppError, AppErrorKind, AppResult, DomainError, ValidationError};
use crate::logging::mask_value;

pub struct WithdrawalService {
    store: SharedStore,
}

impl WithdrawalService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// File a pending request. The balance is checked here but only debited on approval.
    pub async fn request(
        &self,
        user_id: i64,
        amount: BigDecimal,
        withdrawal_address: &str,
    ) -> AppResult<WithdrawalRequest> {
        if amount <= BigDecimal::from(0) {
            return Err(AppError::new(AppErrorKind::Validation(
                ValidationError::InvalidAmount {
                    amount: amount.to_string(),
                    reason: "must be greater than zero".to_string(),
                },
            )));
        }
        let withdrawal_address = withdrawal_address.trim();
        if withdrawal_address.is_empty() {
            return Err(AppError::new(AppErrorKind::Validation(
                ValidationError::MissingField {
                    field: "withdrawal_address".to_string(),
                },
            )));
        }

        let user = self.store.find_user(user_id).await?.ok_or_else(|| {
            AppError::new(AppErrorKind::Domain(DomainError::UserNotFound { user_id }))
        })?;
        if amount > user.balance {
            return Err(AppError::new(AppErrorKind::Validation(
                ValidationError::ExceedsBalance {
                    available: user.balance.to_string(),
                    requested: amount.to_string(),
                },
            )));
        }

        let request = self
            .store
            .create_withdrawal_request(NewWithdrawalRequest {
                user_id,
                amount,
                withdrawal_address: withdrawal_address.to_string(),
            })
            .await?;
        info!(
            user_id,
            withdrawal_id = request.id,
            amount = %request.amount,
            address = %mask_value(&request.withdrawal_address),
            "withdrawal requested"
        );
        Ok(request)
    }

    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<WithdrawalRequest>> {
        Ok(self.store.list_withdrawal_requests(user_id).await?)
    }

    pub async fn list_all(&self) -> AppResult<Vec<WithdrawalRequest>> {
        Ok(self.store.list_all_withdrawal_requests().await?)
    }

    /// Approve or reject a pending request. `status` must be `approved` or `rejected`.
    pub async fn process(
        &self,
        admin_id: i64,
        withdrawal_id: i64,
        status: WithdrawalStatus,
        admin_notes: Option<String>,
    ) -> AppResult<WithdrawalRequest> {
        let approve = match status {
            WithdrawalStatus::Approved => true,
            WithdrawalStatus::Rejected => false,
            WithdrawalStatus::Pending => {
                return Err(AppError::validation(
                    "status",
                    "must be 'approved' or 'rejected'",
                ))
            }
        };

        let outcome = self
            .store
            .process_withdrawal(
                withdrawal_id,
                WithdrawalDecision {
                    approve,
                    admin_notes,
                },
            )
            .await?;

        match outcome {
            WithdrawalOutcome::Processed(request) => {
                info!(
                    admin_id,
                    withdrawal_id,
                    status = %request.status,
                    "withdrawal reviewed"
                );
                Ok(request)
            }
            WithdrawalOutcome::NotFound => Err(AppError::new(AppErrorKind::Domain(
                DomainError::WithdrawalNotFound { withdrawal_id },
            ))),
            WithdrawalOutcome::AlreadyProcessed(current) => Err(AppError::new(
                AppErrorKind::Domain(DomainError::WithdrawalAlreadyProcessed {
                    withdrawal_id,
                    status: current.to_string(),
                }),
            )),
            WithdrawalOutcome::InsufficientBalance {
                available,
                required,
            } => {
                warn!(
                    admin_id,
                    withdrawal_id,
                    available = %available,
                    required = %required,
                    "approval refused, balance no longer covers the withdrawal"
                );
                Err(AppError::new(AppErrorKind::Domain(
                    DomainError::InsufficientBalance {
                        available: available.to_string(),
                        required: required.to_string(),
                    },
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::models::{NewUser, TransactionStatus, TransactionType};
    use crate::database::repository::{TransactionRepository, UserRepository};
    use crate::error::ErrorCode;
    use std::sync::Arc;

    async fn setup(balance: i64) -> (Arc<MemoryStore>, WithdrawalService, i64) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                username: "withdrawer".to_string(),
                referred_by: None,
            })
            .await
            .unwrap();
        store
            .set_balance(user.id, BigDecimal::from(balance))
            .await
            .unwrap();
        (store.clone(), WithdrawalService::new(store), user.id)
    }

    #[tokio::test]
    async fn request_over_balance_is_rejected() {
        let (_, service, user_id) = setup(10).await;
        let err = service
            .request(user_id, BigDecimal::from(11), "addr")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.user_message(), "Insufficient balance");
    }

    #[tokio::test]
    async fn request_requires_address() {
        let (_, service, user_id) = setup(10).await;
        let err = service
            .request(user_id, BigDecimal::from(1), "  ")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn approval_debits_and_records_transaction() {
        let (store, service, user_id) = setup(100).await;
        let request = service
            .request(user_id, BigDecimal::from(40), "addr-1")
            .await
            .unwrap();

        let processed = service
            .process(1, request.id, WithdrawalStatus::Approved, Some("ok".into()))
            .await
            .unwrap();
        assert_eq!(processed.status, WithdrawalStatus::Approved);
        assert!(processed.processed_at.is_some());

        let user = store.find_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.balance, BigDecimal::from(60));
        assert_eq!(user.total_withdrawn, BigDecimal::from(40));

        let txs = store.list_transactions(user_id).await.unwrap();
        assert_eq!(txs[0].kind, TransactionType::Withdrawal);
        assert_eq!(txs[0].status, TransactionStatus::Completed);

        let again = service
            .process(1, request.id, WithdrawalStatus::Rejected, None)
            .await
            .unwrap_err();
        assert_eq!(again.status_code(), 409);
    }

    #[tokio::test]
    async fn approval_after_balance_drop_is_422_and_changes_nothing() {
        let (store, service, user_id) = setup(50).await;
        let request = service
            .request(user_id, BigDecimal::from(50), "addr-2")
            .await
            .unwrap();
        store.set_balance(user_id, BigDecimal::from(20)).await.unwrap();

        let err = service
            .process(1, request.id, WithdrawalStatus::Approved, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), ErrorCode::InsufficientBalance);

        let user = store.find_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.balance, BigDecimal::from(20));
        let pending = service.list_for_user(user_id).await.unwrap();
        assert_eq!(pending[0].status, WithdrawalStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_request_and_pending_status() {
        let (_, service, _) = setup(0).await;
        let err = service
            .process(1, 999, WithdrawalStatus::Rejected, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);

        let err = service
            .process(1, 999, WithdrawalStatus::Pending, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
