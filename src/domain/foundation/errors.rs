//! Error types for the domain layer.
//!
//! # Status Mapping
//!
//! Every [`ErrorCode`] belongs to exactly one [`StatusClass`], which is what the
//! transport layer translates into its own status codes.
//!
//! | StatusClass | Codes |
//! |-------------|-------|
//! | InvalidArgument | ValidationFailed, EmptyField, InvalidFormat, BatchSizeExceeded, InvalidStateTransition, SubscriptionNotActive |
//! | NotFound | EntitlementNotFound, SubscriptionNotFound, PaymentNotFound, DunningEventNotFound |
//! | FailedPrecondition | RetriesExhausted, DunningNotActive |
//! | PermissionDenied | AccessDenied |
//! | Aborted | ConcurrentModification |
//! | DeadlineExceeded | DeadlineExceeded |
//! | Internal | DatabaseError, CacheError, InternalError |

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64, actual: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Coarse status classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    PermissionDenied,
    Aborted,
    DeadlineExceeded,
    Internal,
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,
    EmptyField,
    InvalidFormat,
    BatchSizeExceeded,

    // Not found errors
    EntitlementNotFound,
    SubscriptionNotFound,
    PaymentNotFound,
    DunningEventNotFound,

    // State errors
    InvalidStateTransition,
    RetriesExhausted,
    DunningNotActive,
    SubscriptionNotActive,

    // Authorization errors
    AccessDenied,

    // Concurrency and time errors
    ConcurrentModification,
    DeadlineExceeded,

    // Infrastructure errors
    DatabaseError,
    CacheError,
    InternalError,
}

impl ErrorCode {
    /// Returns the status class this code is reported as.
    pub fn status(&self) -> StatusClass {
        use ErrorCode::*;
        match self {
            ValidationFailed | EmptyField | InvalidFormat | BatchSizeExceeded
            | InvalidStateTransition | SubscriptionNotActive => StatusClass::InvalidArgument,
            EntitlementNotFound | SubscriptionNotFound | PaymentNotFound
            | DunningEventNotFound => StatusClass::NotFound,
            RetriesExhausted | DunningNotActive => StatusClass::FailedPrecondition,
            AccessDenied => StatusClass::PermissionDenied,
            ConcurrentModification => StatusClass::Aborted,
            DeadlineExceeded => StatusClass::DeadlineExceeded,
            DatabaseError | CacheError | InternalError => StatusClass::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::EmptyField => "EMPTY_FIELD",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::BatchSizeExceeded => "BATCH_SIZE_EXCEEDED",
            ErrorCode::EntitlementNotFound => "ENTITLEMENT_NOT_FOUND",
            ErrorCode::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            ErrorCode::PaymentNotFound => "PAYMENT_NOT_FOUND",
            ErrorCode::DunningEventNotFound => "DUNNING_EVENT_NOT_FOUND",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::RetriesExhausted => "RETRIES_EXHAUSTED",
            ErrorCode::DunningNotActive => "DUNNING_NOT_ACTIVE",
            ErrorCode::SubscriptionNotActive => "SUBSCRIPTION_NOT_ACTIVE",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::ConcurrentModification => "CONCURRENT_MODIFICATION",
            ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::CacheError => "CACHE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
            details: HashMap::new(),
        }
        .with_detail("field", field.into())
    }

    /// Creates a persistence error, prefixing the message with the failed operation.
    pub fn database(operation: &str, cause: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, format!("failed to {}: {}", operation, cause))
    }

    /// Wraps an existing error with operation context.
    ///
    /// Errors that already carry a caller-facing class other than `Internal`
    /// keep their code; everything else becomes a `DatabaseError`.
    pub fn context(self, operation: &str) -> Self {
        if self.code.status() == StatusClass::Internal {
            Self {
                code: ErrorCode::DatabaseError,
                message: format!("failed to {}: {}", operation, self.message),
                details: self.details,
            }
        } else {
            self
        }
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Returns the status class of this error.
    pub fn status(&self) -> StatusClass {
        self.code.status()
    }

    /// Returns true if this is an optimistic-concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        self.code == ErrorCode::ConcurrentModification
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        let code = match &err {
            ValidationError::EmptyField { .. } => ErrorCode::EmptyField,
            ValidationError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            ValidationError::OutOfRange { .. } => ErrorCode::ValidationFailed,
        };
        DomainError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("user_id");
        assert_eq!(format!("{}", err), "Field 'user_id' cannot be empty");
    }

    #[test]
    fn validation_error_out_of_range_displays_correctly() {
        let err = ValidationError::out_of_range("checks", 1, 100, 101);
        assert_eq!(
            format!("{}", err),
            "Field 'checks' must be between 1 and 100, got 101"
        );
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found");
        assert_eq!(format!("{}", err), "[SUBSCRIPTION_NOT_FOUND] Subscription not found");
    }

    #[test]
    fn domain_error_with_detail_adds_detail() {
        let err = DomainError::new(ErrorCode::ValidationFailed, "Validation failed")
            .with_detail("field", "feature_code")
            .with_detail("reason", "empty");

        assert_eq!(err.details.get("field"), Some(&"feature_code".to_string()));
        assert_eq!(err.details.get("reason"), Some(&"empty".to_string()));
    }

    #[test]
    fn every_code_maps_to_expected_status() {
        assert_eq!(ErrorCode::BatchSizeExceeded.status(), StatusClass::InvalidArgument);
        assert_eq!(ErrorCode::InvalidStateTransition.status(), StatusClass::InvalidArgument);
        assert_eq!(ErrorCode::PaymentNotFound.status(), StatusClass::NotFound);
        assert_eq!(ErrorCode::RetriesExhausted.status(), StatusClass::FailedPrecondition);
        assert_eq!(ErrorCode::DunningNotActive.status(), StatusClass::FailedPrecondition);
        assert_eq!(ErrorCode::SubscriptionNotActive.status(), StatusClass::InvalidArgument);
        assert_eq!(ErrorCode::AccessDenied.status(), StatusClass::PermissionDenied);
        assert_eq!(ErrorCode::ConcurrentModification.status(), StatusClass::Aborted);
        assert_eq!(ErrorCode::CacheError.status(), StatusClass::Internal);
    }

    #[test]
    fn context_wraps_internal_errors_only() {
        let internal = DomainError::new(ErrorCode::InternalError, "connection reset")
            .context("get subscription");
        assert_eq!(internal.code, ErrorCode::DatabaseError);
        assert_eq!(internal.message, "failed to get subscription: connection reset");

        let conflict = DomainError::new(ErrorCode::ConcurrentModification, "stale version")
            .context("update subscription");
        assert!(conflict.is_conflict());
        assert_eq!(conflict.message, "stale version");
    }

    #[test]
    fn validation_error_converts_to_domain_error() {
        let err: DomainError = ValidationError::empty_field("payment_id").into();
        assert_eq!(err.code, ErrorCode::EmptyField);
        assert_eq!(err.status(), StatusClass::InvalidArgument);
    }

    #[test]
    fn error_code_display_formats_correctly() {
        assert_eq!(format!("{}", ErrorCode::DunningEventNotFound), "DUNNING_EVENT_NOT_FOUND");
        assert_eq!(format!("{}", ErrorCode::InternalError), "INTERNAL_ERROR");
    }
}
