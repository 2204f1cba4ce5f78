//! Applies verified deposits to user balances.

use crate::database::models::{CreditOutcome, DepositCredit};
use crate::database::repository::SharedStore;
use crate::services::callback_processor::CallbackError;
use bigdecimal::BigDecimal;
use chrono::Utc;
use tracing::{error, info, warn};

/// What happened to a verified successful deposit.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOutcome {
    Credited {
        user_id: i64,
        new_balance: BigDecimal,
    },
    AlreadyProcessed,
}

pub struct LedgerService {
    store: SharedStore,
}

impl LedgerService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Credit `amount` to the user who created `order_id`, at most once per order.
    pub async fn apply_deposit(
        &self,
        order_id: &str,
        amount: &BigDecimal,
    ) -> Result<LedgerOutcome, CallbackError> {
        // Read-only check first; `credit_deposit` still enforces exactly-once.
        if self.store.is_order_processed(order_id).await? {
            info!(order_id = %order_id, "deposit already credited, ignoring duplicate");
            return Ok(LedgerOutcome::AlreadyProcessed);
        }

        let Some(order) = self.store.find_payment_order(order_id).await? else {
            return Err(reconciliation_failure(order_id, amount, "no payment order recorded"));
        };

        if &order.amount != amount {
            warn!(
                order_id = %order_id,
                ordered_amount = %order.amount,
                callback_amount = %amount,
                "callback amount differs from ordered amount, crediting callback amount"
            );
        }

        let outcome = self
            .store
            .credit_deposit(DepositCredit {
                order_id: order_id.to_string(),
                user_id: order.user_id,
                amount: amount.clone(),
                transaction_id: order.transaction_id,
            })
            .await?;

        match outcome {
            CreditOutcome::Credited {
                user_id,
                new_balance,
                new_total_deposits,
            } => {
                info!(
                    order_id = %order_id,
                    user_id,
                    amount = %amount,
                    new_balance = %new_balance,
                    total_deposits = %new_total_deposits,
                    "deposit credited"
                );
                Ok(LedgerOutcome::Credited {
                    user_id,
                    new_balance,
                })
            }
            CreditOutcome::AlreadyProcessed => {
                info!(order_id = %order_id, "deposit already credited, ignoring duplicate");
                Ok(LedgerOutcome::AlreadyProcessed)
            }
            CreditOutcome::UnknownUser => Err(reconciliation_failure(
                order_id,
                amount,
                &format!("user {} does not exist", order.user_id),
            )),
        }
    }
}

fn reconciliation_failure(order_id: &str, amount: &BigDecimal, reason: &str) -> CallbackError {
    error!(
        order_id = %order_id,
        amount = %amount,
        timestamp = %Utc::now().to_rfc3339(),
        reason = %reason,
        "verified payment could not be reconciled"
    );
    CallbackError::Reconciliation {
        order_id: order_id.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::models::{NewPaymentOrder, NewUser};
    use crate::database::repository::{LedgerRepository, PaymentOrderRepository, UserRepository};
    use std::str::FromStr;
    use std::sync::Arc;

    #[tokio::test]
    async fn unknown_order_is_a_reconciliation_error() {
        let ledger = LedgerService::new(Arc::new(MemoryStore::new()));
        let err = ledger
            .apply_deposit("42_1700000000000_ffffffff", &BigDecimal::from(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CallbackError::Reconciliation { .. }));
    }

    #[tokio::test]
    async fn credits_the_recorded_user() {
        let store = Arc::new(MemoryStore::new());
        // A second user makes sure the order id prefix is not what resolves the owner.
        store
            .create_user(NewUser {
                username: "first".to_string(),
                referred_by: None,
            })
            .await
            .unwrap();
        let owner = store
            .create_user(NewUser {
                username: "owner".to_string(),
                referred_by: None,
            })
            .await
            .unwrap();
        store
            .record_payment_order(NewPaymentOrder {
                order_id: "1_1700000000000_ab12cd34".to_string(),
                user_id: owner.id,
                transaction_id: None,
                amount: BigDecimal::from(10),
                currency: "USD".to_string(),
            })
            .await
            .unwrap();

        let ledger = LedgerService::new(store.clone());
        let outcome = ledger
            .apply_deposit(
                "1_1700000000000_ab12cd34",
                &BigDecimal::from_str("10.00").unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            LedgerOutcome::Credited {
                user_id: owner.id,
                new_balance: BigDecimal::from(10),
            }
        );
    }

    #[tokio::test]
    async fn processed_order_short_circuits_before_lookup() {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                username: "early".to_string(),
                referred_by: None,
            })
            .await
            .unwrap();
        // Credited directly, so no payment order exists for the id.
        store
            .credit_deposit(DepositCredit {
                order_id: "3_1700000000000_00aa00aa".to_string(),
                user_id: user.id,
                amount: BigDecimal::from(7),
                transaction_id: None,
            })
            .await
            .unwrap();

        let ledger = LedgerService::new(store.clone());
        let outcome = ledger
            .apply_deposit("3_1700000000000_00aa00aa", &BigDecimal::from(7))
            .await
            .unwrap();
        assert_eq!(outcome, LedgerOutcome::AlreadyProcessed);

        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.balance, BigDecimal::from(7));
    }
}
