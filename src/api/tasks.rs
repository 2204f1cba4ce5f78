use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::auth::CurrentUser;
use crate::api::AppState;
use crate::database::models::{Task, UserTask};
use crate::error::AppError;

/// GET /api/tasks
pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, AppError> {
    Ok(Json(state.tasks.list_tasks().await?))
}

/// POST /api/tasks/{task_id}/start
pub async fn start_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<i64>,
) -> Result<(StatusCode, Json<UserTask>), AppError> {
    let user_task = state
        .tasks
        .start_task(user.user_id, task_id)
        .await
        .map_err(|e| user.reject(e))?;
    Ok((StatusCode::CREATED, Json(user_task)))
}
