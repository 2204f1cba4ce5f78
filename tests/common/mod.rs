//! Shared fixtures: an in-memory app, a stand-in UPay server and request helpers.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
    routing::post,
    Json, Router,
};
use bigdecimal::BigDecimal;
use serde_json::{json, Map, Value as JsonValue};
use std::net::SocketAddr;
use std::sync::Arc;
use taskfund_backend::api::{build_router, AppState};
use taskfund_backend::config::{AdminConfig, UpayConfig, UPAY_ORDER_APPLY_PATH};
use taskfund_backend::database::memory::MemoryStore;
use taskfund_backend::database::models::{NewPaymentOrder, NewUser, User};
use taskfund_backend::database::repository::{PaymentOrderRepository, UserRepository};
use taskfund_backend::payments::signature::{callback_signature, sign_params, SIGNATURE_FIELD};
use taskfund_backend::payments::{PaymentGateway, UpayGateway, SIGNATURE_HEADER};
use tokio::sync::Mutex;
use tower::util::ServiceExt;

pub const APP_SECRET: &str = "test-app-secret";
pub const ADMIN_ID: i64 = 1;

/// How the stand-in gateway answers order requests.
#[derive(Clone, Copy, Debug)]
pub enum GatewayMode {
    Accept,
    Refuse,
    ServerError,
}

#[derive(Clone)]
struct MockGatewayState {
    mode: GatewayMode,
    received: Arc<Mutex<Vec<Map<String, JsonValue>>>>,
}

pub struct MockGateway {
    pub addr: SocketAddr,
    pub received: Arc<Mutex<Vec<Map<String, JsonValue>>>>,
}

async fn apply_order(
    State(state): State<MockGatewayState>,
    Json(body): Json<Map<String, JsonValue>>,
) -> (StatusCode, Json<JsonValue>) {
    let presented = body
        .get(SIGNATURE_FIELD)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();
    let signature_ok = presented == sign_params(&body, APP_SECRET);
    let order_no = body
        .get("merchantOrderNo")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();
    state.received.lock().await.push(body);

    if !signature_ok {
        return (
            StatusCode::OK,
            Json(json!({"code": "4001", "message": "signature mismatch"})),
        );
    }

    match state.mode {
        GatewayMode::Accept => (
            StatusCode::OK,
            Json(json!({
                "code": "0000",
                "message": "ok",
                "data": {"payUrl": format!("https://checkout.upay.test/{}", order_no)}
            })),
        ),
        GatewayMode::Refuse => (
            StatusCode::OK,
            Json(json!({"code": "1001", "message": "merchant disabled"})),
        ),
        GatewayMode::ServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "boom"})),
        ),
    }
}

/// Serve a fake UPay order endpoint on an ephemeral port.
pub async fn spawn_mock_gateway(mode: GatewayMode) -> MockGateway {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(UPAY_ORDER_APPLY_PATH, post(apply_order))
        .with_state(MockGatewayState {
            mode,
            received: received.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockGateway { addr, received }
}

pub fn upay_config(base_url: &str) -> UpayConfig {
    let base_url = base_url.to_string();
    UpayConfig::from_lookup(move |key| match key {
        "UPAY_APP_ID" => Some("12345".to_string()),
        "UPAY_APP_SECRET" => Some(APP_SECRET.to_string()),
        "UPAY_BASE_URL" => Some(base_url.clone()),
        "PUBLIC_BASE_URL" => Some("https://taskfund.test".to_string()),
        "UPAY_TIMEOUT_SECS" => Some("5".to_string()),
        _ => None,
    })
    .unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// App wired to a gateway at `base_url`; nothing listens there unless a mock was spawned.
    pub fn new(base_url: &str) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway: Arc<dyn PaymentGateway> =
            Arc::new(UpayGateway::new(upay_config(base_url)).unwrap());
        let state = AppState::new(
            store.clone(),
            gateway,
            AdminConfig {
                admin_user_ids: vec![ADMIN_ID],
            },
            "USD".to_string(),
        );
        Self {
            router: build_router(state),
            store,
        }
    }

    pub fn offline() -> Self {
        Self::new("http://127.0.0.1:9")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn create_user(&self, username: &str, referred_by: Option<i64>) -> User {
        self.store
            .create_user(NewUser {
                username: username.to_string(),
                referred_by,
            })
            .await
            .unwrap()
    }

    pub async fn user(&self, user_id: i64) -> User {
        self.store.find_user(user_id).await.unwrap().unwrap()
    }

    pub async fn record_order(&self, order_id: &str, user_id: i64, amount: &str) {
        self.store
            .record_payment_order(NewPaymentOrder {
                order_id: order_id.to_string(),
                user_id,
                transaction_id: None,
                amount: amount.parse::<BigDecimal>().unwrap(),
                currency: "USD".to_string(),
            })
            .await
            .unwrap();
    }
}

pub fn json_request(method: &str, uri: &str, user_id: Option<i64>, body: JsonValue) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, user_id: Option<i64>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

/// A callback request carrying `signature`, or a correct one when `None`.
pub fn callback_request(raw_body: &str, signature: Option<&str>) -> Request<Body> {
    let signature = match signature {
        Some(s) => s.to_string(),
        None => callback_signature(raw_body.as_bytes(), APP_SECRET).unwrap(),
    };
    Request::builder()
        .method("POST")
        .uri("/api/payments/callback")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(raw_body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> JsonValue {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn dec(value: &str) -> BigDecimal {
    value.parse().unwrap()
}
