use axum::{extract::State, http::StatusCode, Json};
use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::api::auth::CurrentUser;
use crate::api::{ApiJson, AppState};
use crate::database::models::{Transaction, TransactionType};
use crate::error::AppError;
use crate::payments::types::deserialize_amount;

#[derive(Debug, Deserialize)]
pub struct AmountBody {
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: BigDecimal,
}

/// GET /api/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let txs = state
        .transactions
        .list(user.user_id)
        .await
        .map_err(|e| user.reject(e))?;
    Ok(Json(txs))
}

/// POST /api/transactions/deposit
pub async fn record_deposit(
    state: State<AppState>,
    user: CurrentUser,
    body: ApiJson<AmountBody>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    record(state, user, body, TransactionType::Deposit).await
}

/// POST /api/transactions/withdraw
pub async fn record_withdrawal(
    state: State<AppState>,
    user: CurrentUser,
    body: ApiJson<AmountBody>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    record(state, user, body, TransactionType::Withdrawal).await
}

async fn record(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<AmountBody>,
    kind: TransactionType,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let tx = state
        .transactions
        .record_pending(user.user_id, kind, body.amount)
        .await
        .map_err(|e| user.reject(e))?;
    Ok((StatusCode::CREATED, Json(tx)))
}
