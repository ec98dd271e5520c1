//! # Error Types
//!
//! Domain-specific error types for checkout-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  checkout-core errors (this file)                                      │
//! │  ├── CoreError              - Command-level failures                   │
//! │  ├── CouponValidationError  - Why a coupon was refused or detached     │
//! │  └── ValidationError        - Input validation failures                │
//! │                                                                         │
//! │  checkout-db errors (separate crate)                                   │
//! │  └── DbError                - Database operation failures              │
//! │                                                                         │
//! │  register errors (in app)                                              │
//! │  └── ApiError               - What the command caller sees             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → caller                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recovery Contract
//! No error here is fatal. Every command that returns `Err` has left the
//! session exactly as it was before the command ran.

use thiserror::Error;

use crate::money::Money;
use crate::types::SettlementStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Command-level errors of the pricing core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Line item is not in the cart.
    #[error("Item not in cart: {0}")]
    ItemNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A quantity that is zero, negative or otherwise unusable.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// An amount that is negative, zero where positive is required, or
    /// otherwise out of range.
    #[error("Invalid {field}: {reason}")]
    InvalidAmount { field: String, reason: String },

    /// The coupon was refused.
    ///
    /// ## User Workflow
    /// ```text
    /// apply_coupon("SAVE10")
    ///      │
    ///      ▼
    /// validate: active? in window? usage left? minimum met? stacking ok?
    ///      │
    ///      ▼
    /// Coupon(BelowMinimum { .. }) → cart unchanged, reason shown
    /// ```
    #[error("Coupon rejected: {0}")]
    Coupon(#[from] CouponValidationError),

    /// `remove_coupon` was given a code that is not applied.
    #[error("Coupon {0} is not applied to this cart")]
    CouponNotApplied(String),

    /// Tenders do not cover the total.
    ///
    /// The ledger stays open and the remaining balance is reported.
    #[error("Insufficient payment: total {total}, paid {paid}, remaining {remaining}")]
    InsufficientPayment {
        total: Money,
        paid: Money,
        remaining: Money,
    },

    /// Tender id is unknown to the ledger.
    #[error("Tender not found: {0}")]
    TenderNotFound(String),

    /// The settlement ledger no longer accepts changes.
    #[error("Settlement is {status:?}, cannot perform operation")]
    SettlementClosed { status: SettlementStatus },

    /// Cart-changing commands are locked while tenders are recorded.
    #[error("Payment in progress: remove tenders or cancel payment first")]
    PaymentInProgress,

    /// Nothing to settle.
    #[error("Cart is empty")]
    EmptyCart,

    /// A held cart can only be recalled into an empty session.
    #[error("Active cart must be held or cleared first")]
    CartNotEmpty,

    /// A loyalty or store-credit operation needs an attached customer.
    #[error("No customer attached to this cart")]
    NoCustomer,

    /// Redemption exceeds the customer's points.
    #[error("Cannot redeem {requested} points: only {available} available")]
    InsufficientPoints { requested: u64, available: u64 },

    /// Store credit tender with no credit left.
    #[error("No store credit available (requested {requested})")]
    InsufficientStoreCredit { requested: Money },

    /// A gated change is already waiting for approval.
    #[error("Override {0} is already pending approval")]
    OverridePending(String),

    /// Approval was resolved with no change pending.
    #[error("No override is pending approval")]
    NoPendingOverride,

    /// Held cart id is unknown to the store.
    #[error("Held cart not found: {0}")]
    HeldCartNotFound(String),

    /// A snapshot could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Coupon Validation Error
// =============================================================================

/// Why a coupon cannot be (or can no longer be) applied.
///
/// Returned by `apply_coupon`, and reported per detached coupon when a cart
/// change makes an applied coupon invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponValidationError {
    #[error("coupon {0} does not exist")]
    NotFound(String),

    #[error("coupon {0} is inactive")]
    Inactive(String),

    #[error("coupon {0} is not valid yet")]
    NotStarted(String),

    #[error("coupon {0} has expired")]
    Expired(String),

    #[error("coupon {code} has reached its usage limit of {limit}")]
    UsageExhausted { code: String, limit: u32 },

    #[error("coupon {code} requires a minimum purchase of {minimum} (subtotal {subtotal})")]
    BelowMinimum {
        code: String,
        minimum: Money,
        subtotal: Money,
    },

    #[error("coupon {0} is already applied")]
    AlreadyApplied(String),

    /// One of the coupons involved does not allow other coupons.
    #[error("coupon {code} cannot be combined with coupon {conflicting}")]
    StackingConflict { code: String, conflicting: String },

    /// The coupon does not allow a cart discount alongside it.
    #[error("coupon {0} cannot be combined with a cart discount")]
    DiscountConflict(String),
}

impl CouponValidationError {
    /// The coupon code the error is about.
    pub fn code(&self) -> &str {
        match self {
            CouponValidationError::NotFound(code)
            | CouponValidationError::Inactive(code)
            | CouponValidationError::NotStarted(code)
            | CouponValidationError::Expired(code)
            | CouponValidationError::AlreadyApplied(code)
            | CouponValidationError::DiscountConflict(code) => code,
            CouponValidationError::UsageExhausted { code, .. }
            | CouponValidationError::BelowMinimum { code, .. }
            | CouponValidationError::StackingConflict { code, .. } => code,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when command input doesn't meet requirements.
/// They are raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., bad coupon code characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate coupon code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Referenced value does not exist.
    #[error("{field} '{value}' does not exist")]
    Unknown { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_payment_message() {
        let err = CoreError::InsufficientPayment {
            total: Money::from_cents(9180),
            paid: Money::from_cents(4000),
            remaining: Money::from_cents(5180),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: total $91.80, paid $40.00, remaining $51.80"
        );
    }

    #[test]
    fn test_coupon_error_messages() {
        let err = CouponValidationError::BelowMinimum {
            code: "SAVE10".to_string(),
            minimum: Money::from_cents(5000),
            subtotal: Money::from_cents(4200),
        };
        assert_eq!(
            err.to_string(),
            "coupon SAVE10 requires a minimum purchase of $50.00 (subtotal $42.00)"
        );
        assert_eq!(err.code(), "SAVE10");
    }

    #[test]
    fn test_coupon_error_converts_to_core_error() {
        let core_err: CoreError = CouponValidationError::Expired("OLD".to_string()).into();
        assert!(matches!(core_err, CoreError::Coupon(_)));
        assert_eq!(core_err.to_string(), "Coupon rejected: coupon OLD has expired");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
