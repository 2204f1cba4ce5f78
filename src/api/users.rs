use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::api::auth::CurrentUser;
use crate::api::{ApiJson, AppState};
use crate::database::models::User;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub username: String,
    #[serde(default, alias = "referralCode")]
    pub referral_code: Option<String>,
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateUserBody>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state
        .users
        .register(&body.username, body.referral_code.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/user
pub async fn current_user(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<User>, AppError> {
    let found = state
        .users
        .get_user(user.user_id)
        .await
        .map_err(|e| user.reject(e))?;
    Ok(Json(found))
}
