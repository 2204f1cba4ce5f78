use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::api::auth::{AdminUser, CurrentUser};
use crate::api::{ApiJson, AppState};
use crate::database::models::{WithdrawalRequest, WithdrawalStatus};
use crate::error::AppError;
use crate::payments::types::deserialize_amount;

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequestBody {
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: BigDecimal,
    #[serde(alias = "withdrawalAddress")]
    pub withdrawal_address: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessWithdrawalBody {
    pub status: WithdrawalStatus,
    #[serde(default, alias = "adminNotes")]
    pub admin_notes: Option<String>,
}

/// POST /api/withdrawals/request
pub async fn request_withdrawal(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<WithdrawalRequestBody>,
) -> Result<(StatusCode, Json<WithdrawalRequest>), AppError> {
    let request = state
        .withdrawals
        .request(user.user_id, body.amount, &body.withdrawal_address)
        .await
        .map_err(|e| user.reject(e))?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/withdrawals/requests
pub async fn list_my_withdrawals(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<WithdrawalRequest>>, AppError> {
    let requests = state
        .withdrawals
        .list_for_user(user.user_id)
        .await
        .map_err(|e| user.reject(e))?;
    Ok(Json(requests))
}

/// GET /api/admin/withdrawals
pub async fn list_all_withdrawals(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<WithdrawalRequest>>, AppError> {
    let requests = state
        .withdrawals
        .list_all()
        .await
        .map_err(|e| admin.reject(e))?;
    Ok(Json(requests))
}

/// POST /api/admin/withdrawals/{withdrawal_id}/process
pub async fn process_withdrawal(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(withdrawal_id): Path<i64>,
    ApiJson(body): ApiJson<ProcessWithdrawalBody>,
) -> Result<Json<WithdrawalRequest>, AppError> {
    let processed = state
        .withdrawals
        .process(admin.user_id, withdrawal_id, body.status, body.admin_notes)
        .await
        .map_err(|e| admin.reject(e))?;
    Ok(Json(processed))
}
