use axum::http::HeaderMap;
use bigdecimal::BigDecimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::database::error::DatabaseError;
use crate::database::repository::SharedStore;
use crate::error::{AppError, AppErrorKind, DomainError, SecurityError, ValidationError};
use crate::payments::{CallbackPayload, PaymentGateway};
use crate::services::ledger::{LedgerOutcome, LedgerService};

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Reconciliation failed for order {order_id}: {reason}")]
    Reconciliation { order_id: String, reason: String },
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// How a callback that passed verification was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    Credited {
        user_id: i64,
        new_balance: BigDecimal,
    },
    AlreadyProcessed,
    /// Authentic but not a successful payment; acknowledged without crediting.
    Ignored { status: String },
}

pub struct CallbackProcessor {
    gateway: Arc<dyn PaymentGateway>,
    ledger: LedgerService,
}

impl CallbackProcessor {
    pub fn new(gateway: Arc<dyn PaymentGateway>, store: SharedStore) -> Self {
        Self {
            gateway,
            ledger: LedgerService::new(store),
        }
    }

    /// Verify, parse and apply one callback delivery.
    ///
    /// The signature covers the exact bytes received, so nothing is parsed
    /// before verification succeeds.
    pub async fn process_callback(
        &self,
        headers: &HeaderMap,
        raw_body: &[u8],
    ) -> Result<CallbackOutcome, CallbackError> {
        if let Err(e) = self.gateway.verify_callback(headers, raw_body) {
            warn!(gateway = self.gateway.name(), error = %e, "rejected callback");
            return Err(CallbackError::InvalidSignature(e.to_string()));
        }

        let payload: CallbackPayload = serde_json::from_slice(raw_body)
            .map_err(|e| CallbackError::InvalidPayload(e.to_string()))?;

        if !payload.is_success() {
            info!(
                order_id = %payload.order_id,
                status = %payload.status,
                "callback reports a non-successful payment, not crediting"
            );
            return Ok(CallbackOutcome::Ignored {
                status: payload.status,
            });
        }

        if payload.amount <= BigDecimal::from(0) {
            warn!(
                order_id = %payload.order_id,
                amount = %payload.amount,
                "verified callback carries a non-positive amount, not crediting"
            );
            return Err(CallbackError::InvalidPayload(format!(
                "amount must be greater than zero, got {}",
                payload.amount
            )));
        }

        match self
            .ledger
            .apply_deposit(&payload.order_id, &payload.amount)
            .await?
        {
            LedgerOutcome::Credited {
                user_id,
                new_balance,
            } => Ok(CallbackOutcome::Credited {
                user_id,
                new_balance,
            }),
            LedgerOutcome::AlreadyProcessed => Ok(CallbackOutcome::AlreadyProcessed),
        }
    }
}

impl From<CallbackError> for AppError {
    fn from(err: CallbackError) -> Self {
        match err {
            CallbackError::InvalidSignature(reason) => AppError::new(AppErrorKind::Security(
                SecurityError::SignatureVerification { reason },
            )),
            CallbackError::InvalidPayload(reason) => {
                AppError::new(AppErrorKind::Validation(ValidationError::InvalidField {
                    field: "body".to_string(),
                    reason,
                }))
            }
            CallbackError::Reconciliation { order_id, reason } => AppError::new(
                AppErrorKind::Domain(DomainError::Reconciliation { order_id, reason }),
            ),
            CallbackError::Database(e) => e.into(),
        }
    }
}
