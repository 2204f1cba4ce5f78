//! Caller identity. An upstream auth layer sets `x-user-id`; this crate only trusts it.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::api::AppState;
use crate::error::{AppError, AppErrorKind, SecurityError};
use crate::middleware::error::get_request_id_from_headers;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub request_id: Option<String>,
}

impl CurrentUser {
    /// Attach this request's id to an error on its way out.
    pub fn reject(&self, err: impl Into<AppError>) -> AppError {
        with_request_id(err.into(), &self.request_id)
    }
}

/// A caller listed in `ADMIN_USER_IDS`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

fn with_request_id(err: AppError, request_id: &Option<String>) -> AppError {
    match request_id {
        Some(id) => err.with_request_id(id.clone()),
        None => err,
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = get_request_id_from_headers(&parts.headers);
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0);

        match user_id {
            Some(user_id) => Ok(CurrentUser {
                user_id,
                request_id,
            }),
            None => Err(with_request_id(
                AppError::new(AppErrorKind::Security(SecurityError::MissingIdentity)),
                &request_id,
            )),
        }
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !state.admin.is_admin(user.user_id) {
            warn!(user_id = user.user_id, path = %parts.uri.path(), "non-admin hit admin route");
            return Err(with_request_id(
                AppError::new(AppErrorKind::Security(SecurityError::Forbidden {
                    user_id: user.user_id,
                })),
                &user.request_id,
            ));
        }
        Ok(AdminUser(user))
    }
}
