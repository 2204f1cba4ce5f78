use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Gateway `code` meaning the order was accepted.
pub const GATEWAY_SUCCESS_CODE: &str = "0000";

/// Callback `status` meaning the payer completed the payment.
pub const CALLBACK_SUCCESS_STATUS: &str = "SUCCESS";

/// Decimal places of `fiatAmount` on the wire.
pub const FIAT_AMOUNT_SCALE: i64 = 4;

/// Render an amount with exactly four decimal places, rounding half up.
pub fn format_fiat_amount(amount: &BigDecimal) -> String {
    amount
        .with_scale_round(FIAT_AMOUNT_SCALE, RoundingMode::HalfUp)
        .to_string()
}

/// Accept a JSON string or number as a decimal amount.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => BigDecimal::from_str(s.trim()).map_err(D::Error::custom),
        JsonValue::Number(n) => BigDecimal::from_str(&n.to_string()).map_err(D::Error::custom),
        other => Err(D::Error::custom(format!(
            "expected decimal string or number, got {}",
            other
        ))),
    }
}

/// Input to order creation.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub order_id: String,
    pub amount: BigDecimal,
}

/// Returned to the client after the gateway accepted the order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub pay_url: String,
    pub order_id: String,
}

/// Body of `POST /v1/api/open/order/apply`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpayOrderRequest {
    pub app_id: String,
    pub merchant_order_no: String,
    pub chain_type: String,
    pub fiat_amount: String,
    pub fiat_currency: String,
    pub notify_url: String,
    pub redirect_url: String,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Gateway reply to order creation. `payUrl` is read from the top level or from `data`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpayOrderResponse {
    #[serde(default)]
    pub code: JsonValue,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub pay_url: Option<String>,
    #[serde(default)]
    pub data: Option<UpayOrderData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpayOrderData {
    #[serde(default)]
    pub pay_url: Option<String>,
}

impl UpayOrderResponse {
    pub fn code_str(&self) -> String {
        match &self.code {
            JsonValue::String(s) => s.clone(),
            JsonValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code_str() == GATEWAY_SUCCESS_CODE
    }

    pub fn pay_url(&self) -> Option<&str> {
        self.pay_url
            .as_deref()
            .or_else(|| self.data.as_ref().and_then(|d| d.pay_url.as_deref()))
            .filter(|url| !url.is_empty())
    }

    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.msg.clone())
            .unwrap_or_else(|| "Payment request failed".to_string())
    }
}

/// The parsed body of a gateway callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub order_id: String,
    pub status: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: BigDecimal,
    /// Any additional fields the gateway sends
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

impl CallbackPayload {
    pub fn is_success(&self) -> bool {
        self.status == CALLBACK_SUCCESS_STATUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fiat_amount_has_four_decimals() {
        let cases = [
            ("25", "25.0000"),
            ("25.5", "25.5000"),
            ("0.12345", "0.1235"),
            ("100.00001", "100.0000"),
        ];
        for (input, expected) in cases {
            let amount = BigDecimal::from_str(input).unwrap();
            assert_eq!(format_fiat_amount(&amount), expected, "input {}", input);
        }
    }

    #[test]
    fn callback_amount_accepts_string_or_number() {
        let from_string: CallbackPayload = serde_json::from_value(json!({
            "order_id": "1_2_abcdef01",
            "status": "SUCCESS",
            "amount": "25.00"
        }))
        .unwrap();
        let from_number: CallbackPayload = serde_json::from_value(json!({
            "order_id": "1_2_abcdef01",
            "status": "SUCCESS",
            "amount": 25.0,
            "txHash": "0xabc"
        }))
        .unwrap();

        assert_eq!(from_string.amount, from_number.amount);
        assert!(from_number.extra.contains_key("txHash"));
        assert!(from_string.is_success());
    }

    #[test]
    fn order_request_uses_gateway_field_names() {
        let request = UpayOrderRequest {
            app_id: "12345".to_string(),
            merchant_order_no: "1_2_abcdef01".to_string(),
            chain_type: "1".to_string(),
            fiat_amount: "10.0000".to_string(),
            fiat_currency: "USD".to_string(),
            notify_url: "https://x/api/payments/callback".to_string(),
            redirect_url: "https://x/deposit/success".to_string(),
            product_name: "Account Deposit".to_string(),
            signature: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["merchantOrderNo"], "1_2_abcdef01");
        assert_eq!(value["fiatAmount"], "10.0000");
        assert!(value.get("signature").is_none());
    }

    #[test]
    fn gateway_response_variants() {
        let top: UpayOrderResponse =
            serde_json::from_value(json!({"code": "0000", "payUrl": "https://pay/1"})).unwrap();
        assert!(top.is_success());
        assert_eq!(top.pay_url(), Some("https://pay/1"));

        let nested: UpayOrderResponse = serde_json::from_value(
            json!({"code": "0000", "data": {"payUrl": "https://pay/2"}}),
        )
        .unwrap();
        assert_eq!(nested.pay_url(), Some("https://pay/2"));

        let failed: UpayOrderResponse =
            serde_json::from_value(json!({"code": 1001, "message": "sign error"})).unwrap();
        assert!(!failed.is_success());
        assert_eq!(failed.code_str(), "1001");
        assert_eq!(failed.failure_message(), "sign error");
    }
}
