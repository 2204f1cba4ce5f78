//! Unified error handling for the backend
//!
//! Every subsystem error eventually becomes an [`AppError`], which carries the
//! HTTP status mapping, a machine-readable [`ErrorCode`] and a user-facing message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic handling by clients
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Domain errors (4xx, reconciliation 5xx)
    InsufficientBalance,
    UserNotFound,
    TaskNotFound,
    WithdrawalNotFound,
    UsernameTaken,
    WithdrawalAlreadyProcessed,
    ReconciliationError,

    // Infrastructure errors (5xx)
    DatabaseError,
    ConfigurationError,

    // External errors (502, 504)
    PaymentGatewayError,
    ExternalServiceTimeout,

    // Security errors (401, 403)
    Unauthenticated,
    Forbidden,
    SignatureVerificationError,

    // Generic
    InternalError,
    ValidationError,
}

/// Business rule violations
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Balance no longer covers an approved withdrawal
    InsufficientBalance { available: String, required: String },
    UserNotFound { user_id: i64 },
    TaskNotFound { task_id: i64 },
    WithdrawalNotFound { withdrawal_id: i64 },
    UsernameTaken { username: String },
    /// Withdrawal request is no longer pending
    WithdrawalAlreadyProcessed { withdrawal_id: i64, status: String },
    /// A verified callback could not be matched to an order or user
    Reconciliation { order_id: String, reason: String },
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    Database { message: String, is_retryable: bool },
    Configuration { message: String },
}

/// External service errors
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// The payment gateway failed or refused to create an order
    PaymentGateway { message: String, is_retryable: bool },
    Timeout { service: String, timeout_secs: u64 },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    InvalidAmount { amount: String, reason: String },
    MissingField { field: String },
    InvalidField { field: String, reason: String },
    InvalidReferralCode { code: String },
    /// Requested amount is larger than the current balance
    ExceedsBalance { available: String, requested: String },
}

/// Caller identity and message authenticity failures
#[derive(Debug, Clone)]
pub enum SecurityError {
    MissingIdentity,
    Forbidden { user_id: i64 },
    SignatureVerification { reason: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
    Security(SecurityError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }))
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InsufficientBalance { .. } => 422,
                DomainError::UserNotFound { .. } => 404,
                DomainError::TaskNotFound { .. } => 404,
                DomainError::WithdrawalNotFound { .. } => 404,
                DomainError::UsernameTaken { .. } => 409,
                DomainError::WithdrawalAlreadyProcessed { .. } => 409,
                DomainError::Reconciliation { .. } => 500,
            },
            AppErrorKind::Infrastructure(_) => 500,
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { .. } => 502,
                ExternalError::Timeout { .. } => 504,
            },
            AppErrorKind::Validation(_) => 400,
            AppErrorKind::Security(err) => match err {
                SecurityError::MissingIdentity => 401,
                SecurityError::Forbidden { .. } => 403,
                SecurityError::SignatureVerification { .. } => 401,
            },
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
                DomainError::UserNotFound { .. } => ErrorCode::UserNotFound,
                DomainError::TaskNotFound { .. } => ErrorCode::TaskNotFound,
                DomainError::WithdrawalNotFound { .. } => ErrorCode::WithdrawalNotFound,
                DomainError::UsernameTaken { .. } => ErrorCode::UsernameTaken,
                DomainError::WithdrawalAlreadyProcessed { .. } => {
                    ErrorCode::WithdrawalAlreadyProcessed
                }
                DomainError::Reconciliation { .. } => ErrorCode::ReconciliationError,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { .. } => ErrorCode::PaymentGatewayError,
                ExternalError::Timeout { .. } => ErrorCode::ExternalServiceTimeout,
            },
            AppErrorKind::Validation(_) => ErrorCode::ValidationError,
            AppErrorKind::Security(err) => match err {
                SecurityError::MissingIdentity => ErrorCode::Unauthenticated,
                SecurityError::Forbidden { .. } => ErrorCode::Forbidden,
                SecurityError::SignatureVerification { .. } => {
                    ErrorCode::SignatureVerificationError
                }
            },
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InsufficientBalance {
                    available,
                    required,
                } => format!(
                    "Insufficient balance. Available: {}, Required: {}",
                    available, required
                ),
                DomainError::UserNotFound { user_id } => format!("User {} not found", user_id),
                DomainError::TaskNotFound { task_id } => format!("Task {} not found", task_id),
                DomainError::WithdrawalNotFound { withdrawal_id } => {
                    format!("Withdrawal request {} not found", withdrawal_id)
                }
                DomainError::UsernameTaken { username } => {
                    format!("Username '{}' is already taken", username)
                }
                DomainError::WithdrawalAlreadyProcessed {
                    withdrawal_id,
                    status,
                } => format!(
                    "Withdrawal request {} was already {}",
                    withdrawal_id, status
                ),
                // Callers are the gateway, not end users; keep internals out of the body.
                DomainError::Reconciliation { .. } => {
                    "Payment callback could not be reconciled".to_string()
                }
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { message, .. } => {
                    format!("Payment gateway error: {}", message)
                }
                ExternalError::Timeout {
                    service,
                    timeout_secs,
                } => format!(
                    "{} request timed out after {} seconds. Please try again",
                    service, timeout_secs
                ),
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidAmount { amount, reason } => {
                    format!("Invalid amount '{}': {}", amount, reason)
                }
                ValidationError::MissingField { field } => {
                    format!("Required field '{}' is missing", field)
                }
                ValidationError::InvalidField { field, reason } => {
                    format!("Invalid {}: {}", field, reason)
                }
                ValidationError::InvalidReferralCode { code } => {
                    format!("Invalid referral code '{}'", code)
                }
                ValidationError::ExceedsBalance { .. } => "Insufficient balance".to_string(),
            },
            AppErrorKind::Security(err) => match err {
                SecurityError::MissingIdentity => "Not authenticated".to_string(),
                SecurityError::Forbidden { .. } => "Admin access required".to_string(),
                SecurityError::SignatureVerification { .. } => "Invalid signature".to_string(),
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(err) => matches!(err, DomainError::Reconciliation { .. }),
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { is_retryable, .. } => *is_retryable,
                ExternalError::Timeout { .. } => true,
            },
            AppErrorKind::Validation(_) => false,
            AppErrorKind::Security(_) => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

// From<DatabaseError> lives in database/error.rs, From<PaymentError> in payments/error.rs.

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_error() {
        let error = AppError::new(AppErrorKind::Domain(DomainError::InsufficientBalance {
            available: "50".to_string(),
            required: "100".to_string(),
        }));

        assert_eq!(error.status_code(), 422);
        assert_eq!(error.error_code(), ErrorCode::InsufficientBalance);
        assert!(error.user_message().contains("Insufficient balance"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_exceeds_balance_is_a_bad_request() {
        let error = AppError::new(AppErrorKind::Validation(ValidationError::ExceedsBalance {
            available: "10".to_string(),
            requested: "20".to_string(),
        }));

        assert_eq!(error.status_code(), 400);
        assert_eq!(error.user_message(), "Insufficient balance");
    }

    #[test]
    fn test_signature_error_is_unauthorized() {
        let error = AppError::new(AppErrorKind::Security(
            SecurityError::SignatureVerification {
                reason: "missing header".to_string(),
            },
        ));

        assert_eq!(error.status_code(), 401);
        assert_eq!(error.error_code(), ErrorCode::SignatureVerificationError);
        assert!(!error.user_message().contains("missing header"));
    }

    #[test]
    fn test_gateway_errors() {
        let rejected = AppError::new(AppErrorKind::External(ExternalError::PaymentGateway {
            message: "invalid appId".to_string(),
            is_retryable: false,
        }));
        assert_eq!(rejected.status_code(), 502);
        assert!(rejected.user_message().contains("invalid appId"));

        let timeout = AppError::new(AppErrorKind::External(ExternalError::Timeout {
            service: "UPay".to_string(),
            timeout_secs: 30,
        }));
        assert_eq!(timeout.status_code(), 504);
        assert!(timeout.is_retryable());
    }

    #[test]
    fn test_reconciliation_error() {
        let error = AppError::new(AppErrorKind::Domain(DomainError::Reconciliation {
            order_id: "9_1_deadbeef".to_string(),
            reason: "unknown order".to_string(),
        }));

        assert_eq!(error.status_code(), 500);
        assert_eq!(error.error_code(), ErrorCode::ReconciliationError);
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::WithdrawalAlreadyProcessed).unwrap();
        assert_eq!(json, "\"WITHDRAWAL_ALREADY_PROCESSED\"");
    }
}
