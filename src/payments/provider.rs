use crate::payments::error::PaymentResult;
use crate::payments::types::{CreateOrderRequest, PaymentOrder};
use async_trait::async_trait;
use axum::http::HeaderMap;

/// A hosted-checkout gateway: creates payable orders and authenticates their callbacks.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register an order with the gateway and return where the payer should be sent.
    async fn create_order(&self, request: CreateOrderRequest) -> PaymentResult<PaymentOrder>;

    /// Authenticate a callback from its headers and exact raw body.
    ///
    /// `Ok(())` means the body may be trusted; any error rejects the callback.
    fn verify_callback(&self, headers: &HeaderMap, raw_body: &[u8]) -> PaymentResult<()>;

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::error::PaymentError;
    use bigdecimal::BigDecimal;

    struct MockGateway;

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_order(&self, request: CreateOrderRequest) -> PaymentResult<PaymentOrder> {
            Ok(PaymentOrder {
                pay_url: format!("https://pay.example/{}", request.order_id),
                order_id: request.order_id,
            })
        }

        fn verify_callback(&self, headers: &HeaderMap, _raw_body: &[u8]) -> PaymentResult<()> {
            if headers.contains_key("x-mock-signature") {
                Ok(())
            } else {
                Err(PaymentError::WebhookVerificationError {
                    message: "missing".to_string(),
                })
            }
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    #[tokio::test]
    async fn trait_can_be_implemented_by_mock_gateway() {
        let gateway: Box<dyn PaymentGateway> = Box::new(MockGateway);
        let order = gateway
            .create_order(CreateOrderRequest {
                order_id: "1_2_abcdef01".to_string(),
                amount: BigDecimal::from(10),
            })
            .await
            .expect("order creation should succeed");
        assert_eq!(order.order_id, "1_2_abcdef01");
        assert!(gateway.verify_callback(&HeaderMap::new(), b"{}").is_err());
    }
}
