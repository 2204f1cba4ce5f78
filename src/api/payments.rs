use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use crate::api::auth::CurrentUser;
use crate::api::{ApiJson, AppState};
use crate::error::AppError;
use crate::middleware::error::get_request_id_from_headers;
use crate::payments::types::deserialize_amount;
use crate::payments::PaymentOrder;
use crate::services::callback_processor::CallbackOutcome;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentBody {
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: BigDecimal,
}

/// POST /api/payments/create
pub async fn create_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<CreatePaymentBody>,
) -> Result<Json<PaymentOrder>, AppError> {
    let order = state
        .deposits
        .create_deposit(user.user_id, body.amount)
        .await
        .map_err(|e| user.reject(e))?;
    Ok(Json(order))
}

/// POST /api/payments/callback
///
/// Takes the body as raw bytes: the signature covers them exactly.
pub async fn handle_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<JsonValue>, AppError> {
    let request_id = get_request_id_from_headers(&headers);

    match state.callbacks.process_callback(&headers, &body).await {
        Ok(outcome) => {
            match &outcome {
                CallbackOutcome::Credited { user_id, .. } => {
                    info!(user_id, "callback applied")
                }
                CallbackOutcome::AlreadyProcessed => info!("duplicate callback acknowledged"),
                CallbackOutcome::Ignored { status } => {
                    info!(status = %status, "callback acknowledged without credit")
                }
            }
            Ok(Json(json!({ "success": true })))
        }
        Err(e) => {
            warn!(error = %e, "callback not applied");
            let err = AppError::from(e);
            Err(match request_id {
                Some(id) => err.with_request_id(id),
                None => err,
            })
        }
    }
}
