//! Deposit order creation: bookkeeping around the gateway call.

use bigdecimal::{BigDecimal, RoundingMode};
use std::sync::Arc;
use tracing::{error, info};

use crate::database::models::{NewPaymentOrder, NewTransaction, TransactionStatus, TransactionType};
use crate::database::repository::SharedStore;
use crate::error::{AppError, AppErrorKind, AppResult, DomainError, ValidationError};
use crate::payments::types::FIAT_AMOUNT_SCALE;
use crate::payments::{generate_order_id, CreateOrderRequest, PaymentGateway, PaymentOrder};

pub struct DepositService {
    store: SharedStore,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl DepositService {
    pub fn new(store: SharedStore, gateway: Arc<dyn PaymentGateway>, currency: String) -> Self {
        Self {
            store,
            gateway,
            currency,
        }
    }

    pub fn minimum_amount() -> BigDecimal {
        BigDecimal::from(1)
    }

    /// Open a deposit for `user_id` and return where to pay it.
    ///
    /// The order→user mapping is written before the gateway is called so a
    /// fast callback can always be reconciled.
    pub async fn create_deposit(&self, user_id: i64, amount: BigDecimal) -> AppResult<PaymentOrder> {
        if amount < Self::minimum_amount() {
            return Err(AppError::new(AppErrorKind::Validation(
                ValidationError::InvalidAmount {
                    amount: amount.to_string(),
                    reason: "minimum deposit is 1".to_string(),
                },
            )));
        }

        // The gateway and the ledger columns both carry four decimal places.
        if amount.with_scale_round(FIAT_AMOUNT_SCALE, RoundingMode::HalfUp) != amount {
            return Err(AppError::new(AppErrorKind::Validation(
                ValidationError::InvalidAmount {
                    amount: amount.to_string(),
                    reason: format!("at most {} decimal places allowed", FIAT_AMOUNT_SCALE),
                },
            )));
        }

        if self.store.find_user(user_id).await?.is_none() {
            return Err(AppError::new(AppErrorKind::Domain(DomainError::UserNotFound {
                user_id,
            })));
        }

        let order_id = generate_order_id(user_id);
        let transaction = self
            .store
            .create_transaction(NewTransaction {
                user_id,
                kind: TransactionType::Deposit,
                amount: amount.clone(),
                status: TransactionStatus::Pending,
            })
            .await?;

        self.store
            .record_payment_order(NewPaymentOrder {
                order_id: order_id.clone(),
                user_id,
                transaction_id: Some(transaction.id),
                amount: amount.clone(),
                currency: self.currency.clone(),
            })
            .await?;

        let result = self
            .gateway
            .create_order(CreateOrderRequest {
                order_id: order_id.clone(),
                amount: amount.clone(),
            })
            .await;

        match result {
            Ok(order) => {
                info!(
                    user_id,
                    order_id = %order.order_id,
                    amount = %amount,
                    gateway = self.gateway.name(),
                    "deposit order created"
                );
                Ok(order)
            }
            Err(e) => {
                error!(
                    user_id,
                    order_id = %order_id,
                    amount = %amount,
                    error = %e,
                    "gateway refused deposit order"
                );
                self.store
                    .update_transaction_status(transaction.id, TransactionStatus::Failed)
                    .await?;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::models::NewUser;
    use crate::database::repository::{
        PaymentOrderRepository, TransactionRepository, UserRepository,
    };
    use crate::payments::{PaymentError, PaymentResult};
    use async_trait::async_trait;
    use axum::http::HeaderMap;

    struct FixedGateway {
        fail: bool,
    }

    #[async_trait]
    impl PaymentGateway for FixedGateway {
        async fn create_order(&self, request: CreateOrderRequest) -> PaymentResult<PaymentOrder> {
            if self.fail {
                return Err(PaymentError::ProviderError {
                    provider: "fixed".to_string(),
                    message: "merchant disabled".to_string(),
                    provider_code: Some("1001".to_string()),
                    retryable: false,
                });
            }
            Ok(PaymentOrder {
                pay_url: format!("https://pay.example/{}", request.order_id),
                order_id: request.order_id,
            })
        }

        fn verify_callback(&self, _headers: &HeaderMap, _raw_body: &[u8]) -> PaymentResult<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    async fn setup(fail: bool) -> (Arc<MemoryStore>, DepositService, i64) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                username: "depositor".to_string(),
                referred_by: None,
            })
            .await
            .unwrap();
        let service = DepositService::new(
            store.clone(),
            Arc::new(FixedGateway { fail }),
            "USD".to_string(),
        );
        (store, service, user.id)
    }

    #[tokio::test]
    async fn records_mapping_and_pending_transaction() {
        let (store, service, user_id) = setup(false).await;

        let order = service
            .create_deposit(user_id, BigDecimal::from(20))
            .await
            .unwrap();
        assert!(order.order_id.starts_with(&format!("{}_", user_id)));
        assert!(order.pay_url.ends_with(&order.order_id));

        let mapping = store
            .find_payment_order(&order.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.user_id, user_id);

        let txs = store.list_transactions(user_id).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].status, TransactionStatus::Pending);
        assert_eq!(Some(txs[0].id), mapping.transaction_id);
    }

    #[tokio::test]
    async fn gateway_failure_marks_transaction_failed() {
        let (store, service, user_id) = setup(true).await;

        let err = service
            .create_deposit(user_id, BigDecimal::from(20))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 502);

        let txs = store.list_transactions(user_id).await.unwrap();
        assert_eq!(txs[0].status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn rejects_amount_below_minimum_without_side_effects() {
        let (store, service, user_id) = setup(false).await;

        let err = service
            .create_deposit(user_id, "0.5".parse().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(store.list_transactions(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_more_than_four_decimal_places() {
        let (store, service, user_id) = setup(false).await;

        let err = service
            .create_deposit(user_id, "1.00005".parse().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(store.list_transactions(user_id).await.unwrap().is_empty());

        // Trailing zeros beyond the fourth place do not change the value.
        let order = service
            .create_deposit(user_id, "2.500000".parse().unwrap())
            .await
            .unwrap();
        let mapping = store
            .find_payment_order(&order.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.amount, "2.5".parse::<BigDecimal>().unwrap());
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (_, service, _) = setup(false).await;
        let err = service
            .create_deposit(999, BigDecimal::from(5))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
