//! HTTP surface: shared state, extractors and the router.

pub mod auth;
pub mod health;
pub mod payments;
pub mod tasks;
pub mod team;
pub mod transactions;
pub mod users;
pub mod withdrawals;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

use crate::config::{AdminConfig, CALLBACK_PATH};
use crate::database::repository::SharedStore;
use crate::error::AppError;
use crate::health::HealthChecker;
use crate::middleware::error::get_request_id_from_headers;
use crate::middleware::logging::{request_logging_middleware, UuidRequestId};
use crate::payments::PaymentGateway;
use crate::services::callback_processor::CallbackProcessor;
use crate::services::deposits::DepositService;
use crate::services::tasks::TaskService;
use crate::services::team::TeamService;
use crate::services::transactions::TransactionService;
use crate::services::users::UserService;
use crate::services::withdrawals::WithdrawalService;

/// Everything a handler can reach. Services are built once and shared.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub tasks: Arc<TaskService>,
    pub transactions: Arc<TransactionService>,
    pub deposits: Arc<DepositService>,
    pub callbacks: Arc<CallbackProcessor>,
    pub withdrawals: Arc<WithdrawalService>,
    pub team: Arc<TeamService>,
    pub admin: Arc<AdminConfig>,
    pub health_checker: HealthChecker,
}

impl AppState {
    pub fn new(
        store: SharedStore,
        gateway: Arc<dyn PaymentGateway>,
        admin: AdminConfig,
        fiat_currency: String,
    ) -> Self {
        Self {
            users: Arc::new(UserService::new(store.clone())),
            tasks: Arc::new(TaskService::new(store.clone())),
            transactions: Arc::new(TransactionService::new(store.clone())),
            deposits: Arc::new(DepositService::new(
                store.clone(),
                gateway.clone(),
                fiat_currency,
            )),
            callbacks: Arc::new(CallbackProcessor::new(gateway, store.clone())),
            withdrawals: Arc::new(WithdrawalService::new(store.clone())),
            team: Arc::new(TeamService::new(store.clone())),
            admin: Arc::new(admin),
            health_checker: HealthChecker::new(store),
        }
    }
}

/// JSON body extractor whose rejections render as a 400 [`AppError`].
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = get_request_id_from_headers(req.headers());
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                let err = AppError::validation("body", json_rejection_reason(&rejection));
                Err(match request_id {
                    Some(id) => err.with_request_id(id),
                    None => err,
                })
            }
        }
    }
}

fn json_rejection_reason(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "expected Content-Type: application/json".to_string()
        }
        other => other.body_text(),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/health/live", get(health::liveness))
        .route("/api/users", post(users::create_user))
        .route("/api/user", get(users::current_user))
        .route("/api/tasks", get(tasks::list_tasks))
        .route("/api/tasks/{task_id}/start", post(tasks::start_task))
        .route("/api/transactions", get(transactions::list_transactions))
        .route("/api/transactions/deposit", post(transactions::record_deposit))
        .route("/api/transactions/withdraw", post(transactions::record_withdrawal))
        .route("/api/payments/create", post(payments::create_payment))
        .route(CALLBACK_PATH, post(payments::handle_callback))
        .route("/api/withdrawals/request", post(withdrawals::request_withdrawal))
        .route("/api/withdrawals/requests", get(withdrawals::list_my_withdrawals))
        .route("/api/admin/withdrawals", get(withdrawals::list_all_withdrawals))
        .route(
            "/api/admin/withdrawals/{withdrawal_id}/process",
            post(withdrawals::process_withdrawal),
        )
        .route("/api/team/stats", get(team::team_stats))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
