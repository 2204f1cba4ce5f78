use crate::payments::error::{PaymentError, PaymentResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Thin JSON-over-HTTP client for gateway calls.
///
/// Each call is a single attempt bounded by `timeout`; failures are returned
/// to the caller instead of being retried.
#[derive(Clone)]
pub struct PaymentHttpClient {
    client: Client,
    timeout: Duration,
    provider: &'static str,
}

impl PaymentHttpClient {
    pub fn new(provider: &'static str, timeout: Duration) -> PaymentResult<Self> {
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| PaymentError::NetworkError {
                    message: format!("failed to initialize HTTP client: {}", e),
                })?;

        Ok(Self {
            client,
            timeout,
            provider,
        })
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> PaymentResult<T> {
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            warn!(
                provider = self.provider,
                status = %status,
                "gateway returned non-success HTTP status"
            );
            return Err(PaymentError::ProviderError {
                provider: self.provider.to_string(),
                message: format!("HTTP {}: {}", status, text),
                provider_code: Some(status.as_u16().to_string()),
                retryable: status.is_server_error(),
            });
        }

        serde_json::from_str::<T>(&text).map_err(|e| PaymentError::ProviderError {
            provider: self.provider.to_string(),
            message: format!("invalid provider JSON response: {}", e),
            provider_code: None,
            retryable: false,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> PaymentError {
        if err.is_timeout() {
            PaymentError::TimeoutError {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            PaymentError::NetworkError {
                message: format!("provider request failed: {}", err),
            }
        }
    }
}

/// Constant-time byte comparison.
pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
