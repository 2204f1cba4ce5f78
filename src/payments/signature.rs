//! Request signing and callback verification for the UPay gateway.
//!
//! Two unrelated contracts live here and must stay separate:
//! outbound order requests are signed with MD5 over a canonical, key-sorted
//! `key=value&...&appSecret=` string, while inbound callbacks carry an
//! HMAC-SHA256 of the raw body in a header.

use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::utils::secure_eq;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use sha2::Sha256;

/// Key excluded from the canonical string even when present in the parameter set.
pub const SIGNATURE_FIELD: &str = "signature";

type HmacSha256 = Hmac<Sha256>;

/// Build the canonical `key=value&...` string for a parameter object.
///
/// Null values and the `signature` key are dropped, every remaining value is
/// stringified and keys are sorted byte-wise ascending.
pub fn canonical_string(params: &Map<String, JsonValue>) -> String {
    let mut pairs: Vec<(&str, String)> = params
        .iter()
        .filter(|(key, value)| !value.is_null() && key.as_str() != SIGNATURE_FIELD)
        .map(|(key, value)| (key.as_str(), stringify(value)))
        .collect();
    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// The exact string fed to the digest: canonical parameters plus the secret suffix.
pub fn signing_input(params: &Map<String, JsonValue>, app_secret: &str) -> String {
    format!("{}&appSecret={}", canonical_string(params), app_secret)
}

/// MD5 of the signing input, uppercase hex.
pub fn sign_params(params: &Map<String, JsonValue>, app_secret: &str) -> String {
    let digest = Md5::digest(signing_input(params, app_secret).as_bytes());
    hex::encode_upper(digest)
}

/// Serialize a request struct and sign its fields.
pub fn sign_request<T: Serialize>(request: &T, app_secret: &str) -> PaymentResult<String> {
    match serde_json::to_value(request) {
        Ok(JsonValue::Object(params)) => Ok(sign_params(&params, app_secret)),
        Ok(other) => Err(PaymentError::ValidationError {
            message: format!("signable request must be a JSON object, got {}", other),
            field: None,
        }),
        Err(e) => Err(PaymentError::ValidationError {
            message: format!("failed to serialize request for signing: {}", e),
            field: None,
        }),
    }
}

/// Lowercase hex HMAC-SHA256 of `payload`.
pub fn callback_signature(payload: &[u8], app_secret: &str) -> PaymentResult<String> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes()).map_err(|e| {
        PaymentError::WebhookVerificationError {
            message: format!("invalid callback key: {}", e),
        }
    })?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a presented callback signature against the raw body.
///
/// The comparison is exact and case-sensitive.
pub fn verify_callback_signature(payload: &[u8], app_secret: &str, presented: &str) -> bool {
    match callback_signature(payload, app_secret) {
        Ok(expected) => secure_eq(expected.as_bytes(), presented.as_bytes()),
        Err(_) => false,
    }
}

fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
