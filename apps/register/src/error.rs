//! # API Error Type
//!
//! Unified error type for register commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Register                           │
//! │                                                                         │
//! │  stdin: {"command":"apply_coupon","code":"WELCOME5"}                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  dispatch() → Result<Value, ApiError>                            │  │
//! │  │         │                                                        │  │
//! │  │  CoreError::Coupon(BelowMinimum) ──┐                             │  │
//! │  │  DbError::NotFound ────────────────┼──► ApiError { code, message }│  │
//! │  │  serde_json::Error (bad request) ──┘                             │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  stdout: {"ok":false,"error":{"code":"COUPON_REJECTED",                │
//! │           "message":"Coupon rejected: coupon WELCOME5 requires ..."}}   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use checkout_core::CoreError;
use checkout_db::DbError;

/// API error returned from register commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "PAYMENT_ERROR",
///   "message": "Insufficient payment: total $91.80, paid $40.00, remaining $51.80"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request line is not a known command
    InvalidRequest,

    /// Line item, coupon, tender or held cart not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Cart limits, locked cart, non-empty cart on recall
    CartError,

    /// Coupon refused or not applied
    CouponRejected,

    /// Tender and settlement failures
    PaymentError,

    /// Loyalty and store credit failures
    CustomerError,

    /// Override gate misuse
    OverrideError,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidRequest, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::InvalidRecord(reason) => ApiError::new(ErrorCode::ValidationError, reason),
            DbError::Migration(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::Sqlite(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ItemNotFound(_)
            | CoreError::TenderNotFound(_)
            | CoreError::HeldCartNotFound(_) => ErrorCode::NotFound,

            CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::PaymentInProgress
            | CoreError::EmptyCart
            | CoreError::CartNotEmpty => ErrorCode::CartError,

            CoreError::InvalidQuantity(_)
            | CoreError::InvalidAmount { .. }
            | CoreError::Validation(_) => ErrorCode::ValidationError,

            CoreError::Coupon(_) | CoreError::CouponNotApplied(_) => ErrorCode::CouponRejected,

            CoreError::InsufficientPayment { .. } | CoreError::SettlementClosed { .. } => {
                ErrorCode::PaymentError
            }

            CoreError::NoCustomer
            | CoreError::InsufficientPoints { .. }
            | CoreError::InsufficientStoreCredit { .. } => ErrorCode::CustomerError,

            CoreError::OverridePending(_) | CoreError::NoPendingOverride => {
                ErrorCode::OverrideError
            }

            CoreError::Serialization(e) => {
                tracing::error!("Serialization failed: {}", e);
                ErrorCode::Internal
            }
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal(format!("Failed to encode response: {}", err))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::{CouponValidationError, Money};

    #[test]
    fn test_core_error_codes() {
        let err: ApiError = CoreError::Coupon(CouponValidationError::Expired("OLD".into())).into();
        assert_eq!(err.code, ErrorCode::CouponRejected);
        assert_eq!(err.message, "Coupon rejected: coupon OLD has expired");

        let err: ApiError = CoreError::InsufficientPayment {
            total: Money::from_cents(9180),
            paid: Money::from_cents(4000),
            remaining: Money::from_cents(5180),
        }
        .into();
        assert_eq!(err.code, ErrorCode::PaymentError);
    }

    #[test]
    fn test_db_error_hides_details() {
        let err: ApiError = DbError::Sqlite("near \"SELEC\": syntax error".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ApiError::not_found("Coupon", "NOPE")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Coupon not found: NOPE");
    }
}
