//! Health check module
//! Provides health status for the application and its store

use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::database::error::DatabaseError;
use crate::database::repository::SharedStore;

/// Store checks slower than this are reported as a warning
const SLOW_CHECK_MS: u128 = 1000;
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Health status response
#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Overall health state
#[derive(Debug, Serialize, Clone)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health status
#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub response_time_ms: Option<u128>,
    pub details: Option<String>,
}

/// Component state
#[derive(Debug, Serialize, Clone)]
pub enum ComponentState {
    Up,
    Down,
    Warning,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            status: HealthState::Healthy,
            checks: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        !matches!(self.status, HealthState::Unhealthy)
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentHealth {
    pub fn up(response_time_ms: Option<u128>) -> Self {
        Self {
            status: ComponentState::Up,
            response_time_ms,
            details: None,
        }
    }

    pub fn down(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Down,
            response_time_ms: None,
            details,
        }
    }

    pub fn warning(response_time_ms: Option<u128>, details: Option<String>) -> Self {
        Self {
            status: ComponentState::Warning,
            response_time_ms,
            details,
        }
    }
}

/// Health checker for the application
#[derive(Clone)]
pub struct HealthChecker {
    store: SharedStore,
}

impl HealthChecker {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Check every dependency; today that is only the store.
    pub async fn check_health(&self) -> HealthStatus {
        let mut health_status = HealthStatus::new();
        let component = format!("store:{}", self.store.backend_name());

        let store_health = match timeout(CHECK_TIMEOUT, check_store_health(&self.store)).await {
            Ok(Ok(response_time)) if response_time > SLOW_CHECK_MS => {
                warn!(response_time_ms = response_time, "Store health check slow");
                health_status.status = HealthState::Degraded;
                ComponentHealth::warning(Some(response_time), Some("Slow response".to_string()))
            }
            Ok(Ok(response_time)) => {
                info!(response_time_ms = response_time, "Store health check: OK");
                ComponentHealth::up(Some(response_time))
            }
            Ok(Err(e)) => {
                error!(error = %e, "Store health check failed");
                health_status.status = HealthState::Unhealthy;
                ComponentHealth::down(Some(e.to_string()))
            }
            Err(_) => {
                error!("Store health check timed out");
                health_status.status = HealthState::Unhealthy;
                ComponentHealth::down(Some("Timeout".to_string()))
            }
        };

        health_status.checks.insert(component, store_health);
        health_status
    }
}

pub async fn check_store_health(store: &SharedStore) -> Result<u128, DatabaseError> {
    let start = Instant::now();
    store.ping().await?;
    Ok(start.elapsed().as_millis())
}
