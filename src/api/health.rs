use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, error};

use crate::api::AppState;
use crate::health::HealthStatus;

pub async fn root() -> &'static str {
    "TaskFund backend"
}

pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, Json<HealthStatus>)> {
    let health_status = state.health_checker.check_health().await;

    if health_status.is_healthy() {
        debug!("Health check passed");
        Ok(Json(health_status))
    } else {
        error!("Health check failed - service unhealthy");
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(health_status)))
    }
}

/// Readiness check: ready once the store answers
pub async fn readiness(
    state: State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, Json<HealthStatus>)> {
    health(state).await
}

/// Liveness check: the process is running
pub async fn liveness() -> &'static str {
    "OK"
}
