//! UPay hosted-checkout gateway.

use crate::config::UpayConfig;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::PaymentGateway;
use crate::payments::signature::{sign_request, verify_callback_signature};
use crate::payments::types::{
    format_fiat_amount, CreateOrderRequest, PaymentOrder, UpayOrderRequest, UpayOrderResponse,
};
use crate::payments::utils::PaymentHttpClient;
use async_trait::async_trait;
use axum::http::HeaderMap;
use bigdecimal::BigDecimal;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

pub const SIGNATURE_HEADER: &str = "x-upay-signature";

const PROVIDER: &str = "upay";
const MAX_ORDER_ID_LEN: usize = 64;

/// `{userId}_{timestampMillis}_{8 lowercase hex}`, unique per attempt.
pub fn generate_order_id(user_id: i64) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        user_id,
        Utc::now().timestamp_millis(),
        &random[..8]
    )
}

pub fn validate_order_id(order_id: &str) -> PaymentResult<()> {
    if order_id.is_empty() || order_id.len() > MAX_ORDER_ID_LEN {
        return Err(PaymentError::validation(
            format!("order id must be 1-{} characters", MAX_ORDER_ID_LEN),
            "order_id",
        ));
    }
    if !order_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(PaymentError::validation(
            "order id may only contain letters, digits, '_' and '-'",
            "order_id",
        ));
    }
    Ok(())
}

pub struct UpayGateway {
    config: UpayConfig,
    http: PaymentHttpClient,
}

impl UpayGateway {
    pub fn new(config: UpayConfig) -> PaymentResult<Self> {
        let http = PaymentHttpClient::new(PROVIDER, config.timeout())?;
        Ok(Self { config, http })
    }

    /// Build and sign the outbound order body.
    pub fn build_order_request(
        &self,
        order_id: &str,
        amount: &BigDecimal,
    ) -> PaymentResult<UpayOrderRequest> {
        let mut request = UpayOrderRequest {
            app_id: self.config.app_id.clone(),
            merchant_order_no: order_id.to_string(),
            chain_type: self.config.chain_type.clone(),
            fiat_amount: format_fiat_amount(amount),
            fiat_currency: self.config.fiat_currency.clone(),
            notify_url: self.config.notify_url(),
            redirect_url: self.config.redirect_url(),
            product_name: self.config.product_name.clone(),
            signature: None,
        };
        request.signature = Some(sign_request(&request, &self.config.app_secret)?);
        Ok(request)
    }
}

#[async_trait]
impl PaymentGateway for UpayGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> PaymentResult<PaymentOrder> {
        validate_order_id(&request.order_id)?;
        if request.amount <= BigDecimal::from(0) {
            return Err(PaymentError::validation(
                "amount must be greater than zero",
                "amount",
            ));
        }

        let body = self.build_order_request(&request.order_id, &request.amount)?;
        info!(
            order_id = %request.order_id,
            fiat_amount = %body.fiat_amount,
            fiat_currency = %body.fiat_currency,
            "creating UPay payment order"
        );

        let response: UpayOrderResponse = self
            .http
            .post_json(&self.config.order_endpoint(), &body)
            .await
            .inspect_err(|e| {
                warn!(order_id = %request.order_id, error = %e, "UPay order request failed");
            })?;

        if !response.is_success() {
            let code = response.code_str();
            warn!(
                order_id = %request.order_id,
                gateway_code = %code,
                "UPay rejected payment order"
            );
            return Err(PaymentError::ProviderError {
                provider: PROVIDER.to_string(),
                message: response.failure_message(),
                provider_code: Some(code),
                retryable: false,
            });
        }

        let pay_url = response
            .pay_url()
            .ok_or_else(|| PaymentError::ProviderError {
                provider: PROVIDER.to_string(),
                message: "gateway accepted the order but returned no payUrl".to_string(),
                provider_code: Some(response.code_str()),
                retryable: false,
            })?
            .to_string();

        info!(order_id = %request.order_id, "UPay payment order created");
        Ok(PaymentOrder {
            pay_url,
            order_id: request.order_id,
        })
    }

    fn verify_callback(&self, headers: &HeaderMap, raw_body: &[u8]) -> PaymentResult<()> {
        let presented = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| PaymentError::WebhookVerificationError {
                message: format!("missing {} header", SIGNATURE_HEADER),
            })?;

        if verify_callback_signature(raw_body, &self.config.app_secret, presented) {
            Ok(())
        } else {
            Err(PaymentError::WebhookVerificationError {
                message: "callback signature mismatch".to_string(),
            })
        }
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
