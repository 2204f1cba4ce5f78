use axum::{extract::State, Json};

use crate::api::auth::CurrentUser;
use crate::api::AppState;
use crate::error::AppError;
use crate::services::team::TeamStats;

/// GET /api/team/stats
pub async fn team_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<TeamStats>, AppError> {
    let stats = state
        .team
        .stats(user.user_id)
        .await
        .map_err(|e| user.reject(e))?;
    Ok(Json(stats))
}
