//! Error response formatting
//!
//! Every failed request gets the same JSON body shape with an error code,
//! a user-facing message and the request id for support lookups.

use crate::error::{AppError, ErrorCode};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Standardized error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Request ID for debugging and support
    pub request_id: Option<String>,

    /// RFC 3339 timestamp of the error
    pub timestamp: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Whether the client should retry the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorResponse {
    pub fn from_app_error(error: &AppError) -> Self {
        Self {
            error: error.error_code(),
            message: error.user_message(),
            request_id: error.request_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
            details: None,
            retryable: Some(error.is_retryable()),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            tracing::error!(
                error = ?self,
                request_id = ?self.request_id,
                status = %status_code.as_u16(),
                "Server error occurred"
            );
        } else {
            tracing::warn!(
                error = ?self,
                request_id = ?self.request_id,
                status = %status_code.as_u16(),
                "Client error occurred"
            );
        }

        let mut error_response = ErrorResponse::from_app_error(&self);
        if let Some(context) = &self.context {
            if !status_code.is_server_error() {
                error_response = error_response.with_details(serde_json::json!({
                    "context": context,
                }));
            }
        }
        (status_code, Json(error_response)).into_response()
    }
}

/// Helper to extract request ID from request headers
pub fn get_request_id_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppErrorKind, DomainError, SecurityError, ValidationError};
    use axum::http::HeaderMap;

    #[test]
    fn test_error_response_from_app_error() {
        let app_error = AppError::new(AppErrorKind::Domain(DomainError::InsufficientBalance {
            available: "50".to_string(),
            required: "100".to_string(),
        }))
        .with_request_id("req_123");

        let error_response = ErrorResponse::from_app_error(&app_error);

        assert_eq!(error_response.error, ErrorCode::InsufficientBalance);
        assert_eq!(error_response.request_id, Some("req_123".to_string()));
        assert_eq!(error_response.retryable, Some(false));
    }

    #[test]
    fn test_app_error_into_response() {
        let app_error = AppError::new(AppErrorKind::Validation(ValidationError::InvalidAmount {
            amount: "-100".to_string(),
            reason: "Amount must be positive".to_string(),
        }));

        let response = app_error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_security_errors_map_to_auth_statuses() {
        let missing = AppError::new(AppErrorKind::Security(SecurityError::MissingIdentity));
        assert_eq!(missing.into_response().status(), StatusCode::UNAUTHORIZED);

        let forbidden = AppError::new(AppErrorKind::Security(SecurityError::Forbidden {
            user_id: 5,
        }));
        assert_eq!(forbidden.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_request_id_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(get_request_id_from_headers(&headers), None);

        headers.insert("x-request-id", "abc-123".parse().unwrap());
        assert_eq!(
            get_request_id_from_headers(&headers),
            Some("abc-123".to_string())
        );
    }
}
