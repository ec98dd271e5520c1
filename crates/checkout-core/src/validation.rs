//! # Validation Module
//!
//! Input validation for commands and coupon definitions.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Register command decoding (serde)                            │
//! │  ├── Type validation (numbers are numbers, enums are known)            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Ranges, required fields, coupon definition consistency            │
//! │  └── Runs BEFORE any state mutation                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE coupon code                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use checkout_core::validation::{validate_coupon_code, validate_quantity};
//!
//! validate_coupon_code("SAVE10").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::coupon::{Coupon, CouponKind};
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{DiscountValue, Percentage};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_TENDER_AMOUNT, MAX_UNIT_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted coupon code.
pub const MAX_COUPON_CODE_LEN: usize = 32;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a line item identifier.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
pub fn validate_item_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "item id".to_string(),
        });
    }

    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "item id".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a line item name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
///
/// ## Example
/// ```rust
/// use checkout_core::validation::validate_item_name;
///
/// assert!(validate_item_name("Coca-Cola 330ml").is_ok());
/// assert!(validate_item_name("").is_err());
/// ```
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a coupon code.
///
/// ## Rules
/// - Must not be empty
/// - At most 32 characters
/// - Letters, digits, hyphens and underscores only
///
/// Codes are case-insensitive; callers normalize with
/// [`Coupon::normalize_code`] after validation.
///
/// ## Example
/// ```rust
/// use checkout_core::validation::validate_coupon_code;
///
/// assert!(validate_coupon_code("save10").is_ok());
/// assert!(validate_coupon_code("SAVE 10").is_err());
/// ```
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "coupon code".to_string(),
        });
    }

    if code.len() > MAX_COUPON_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "coupon code".to_string(),
            max: MAX_COUPON_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "coupon code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Item                                                         │
/// │                                                                         │
/// │  Cashier enters quantity: 5                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       │                                                                 │
/// │       └── OK → Proceed with add_item                                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
/// - At most `MAX_UNIT_PRICE`
///
/// ## Example
/// ```rust
/// use checkout_core::money::Money;
/// use checkout_core::validation::validate_price;
/// use checkout_core::MAX_UNIT_PRICE;
///
/// assert!(validate_price(Money::from_cents(1099)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_cents(-100)).is_err());
/// assert!(validate_price(Money::from_cents(MAX_UNIT_PRICE + 1)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    validate_amount_in_range("price", price, MAX_UNIT_PRICE)
}

/// Validates a tender amount.
///
/// ## Rules
/// - Must be positive (> 0)
/// - At most `MAX_TENDER_AMOUNT`
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    validate_amount_in_range("payment amount", amount, MAX_TENDER_AMOUNT)
}

fn validate_amount_in_range(field: &str, amount: Money, max: i64) -> ValidationResult<()> {
    if amount.is_negative() || amount.cents() > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max,
        });
    }

    Ok(())
}

/// Validates a percentage (0% to 100%).
pub fn validate_percentage(field: &str, value: Percentage) -> ValidationResult<()> {
    if !value.is_valid() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates a discount value.
///
/// ## Rules
/// - Percentage: 0% to 100%
/// - Fixed: non-negative, at most `MAX_UNIT_PRICE`
pub fn validate_discount_value(value: &DiscountValue) -> ValidationResult<()> {
    match value {
        DiscountValue::Percentage { value } => validate_percentage("discount percentage", *value),
        DiscountValue::Fixed { value } => {
            validate_amount_in_range("discount amount", *value, MAX_UNIT_PRICE)
        }
    }
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size (number of distinct lines) before adding a line.
///
/// ## Rules
/// - Must not exceed MAX_CART_ITEMS (100)
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Coupon Definition Validator
// =============================================================================

/// Validates a coupon definition before it enters the catalog.
///
/// ## Rules
/// - Code and name are valid
/// - Validity window ends after it starts
/// - Percentages are within 0% to 100%, amounts non-negative
/// - Buy-x-get-y quantities are at least 1
/// - Category discounts name at least one category
/// - `usage_count` does not exceed `usage_limit`
pub fn validate_coupon(coupon: &Coupon) -> ValidationResult<()> {
    validate_coupon_code(&coupon.code)?;
    validate_item_name(&coupon.name)?;

    if coupon.end_date < coupon.start_date {
        return Err(ValidationError::InvalidFormat {
            field: "end date".to_string(),
            reason: "must not be before the start date".to_string(),
        });
    }

    if let Some(minimum) = coupon.minimum_purchase {
        validate_price(minimum)?;
    }

    if let Some(limit) = coupon.usage_limit {
        if coupon.usage_count > limit {
            return Err(ValidationError::OutOfRange {
                field: "usage count".to_string(),
                min: 0,
                max: i64::from(limit),
            });
        }
    }

    if let Some(cap) = coupon.stacking_rules.max_stacking_value {
        validate_percentage("max stacking value", cap)?;
    }

    match &coupon.kind {
        CouponKind::Percentage {
            percent,
            maximum_discount,
        } => {
            validate_percentage("coupon percentage", *percent)?;
            if let Some(max) = maximum_discount {
                validate_price(*max)?;
            }
        }
        CouponKind::Fixed { amount } => validate_price(*amount)?,
        CouponKind::BuyXGetY {
            buy_quantity,
            get_quantity,
            categories,
        } => {
            if *buy_quantity == 0 {
                return Err(ValidationError::MustBePositive {
                    field: "buy quantity".to_string(),
                });
            }
            if *get_quantity == 0 {
                return Err(ValidationError::MustBePositive {
                    field: "get quantity".to_string(),
                });
            }
            if let Some(categories) = categories {
                validate_categories(categories)?;
            }
        }
        CouponKind::CategoryDiscount {
            categories,
            discount,
            maximum_discount,
        } => {
            validate_categories(categories)?;
            validate_discount_value(discount)?;
            if let Some(max) = maximum_discount {
                validate_price(*max)?;
            }
        }
    }

    Ok(())
}

fn validate_categories(categories: &[String]) -> ValidationResult<()> {
    if categories.iter().all(|c| c.trim().is_empty()) {
        return Err(ValidationError::Required {
            field: "applicable categories".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::StackingRules;
    use chrono::{Duration, Utc};

    fn coupon(kind: CouponKind) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: "TEST".to_string(),
            name: "Test coupon".to_string(),
            description: String::new(),
            kind,
            minimum_purchase: None,
            start_date: now,
            end_date: now + Duration::days(1),
            usage_limit: None,
            usage_count: 0,
            is_active: true,
            stacking_rules: StackingRules::default(),
        }
    }

    #[test]
    fn test_validate_coupon_code() {
        assert!(validate_coupon_code("SAVE10").is_ok());
        assert!(validate_coupon_code("bogo_2-for-1").is_ok());

        assert!(validate_coupon_code("").is_err());
        assert!(validate_coupon_code("   ").is_err());
        assert!(validate_coupon_code("has space").is_err());
        assert!(validate_coupon_code(&"A".repeat(40)).is_err());
    }

    #[test]
    fn test_validate_item_name() {
        assert!(validate_item_name("Coca-Cola 330ml").is_ok());
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(Money::from_cents(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_cents(-5)).is_err());
        assert!(validate_payment_amount(Money::from_cents(MAX_TENDER_AMOUNT)).is_ok());
        assert!(validate_payment_amount(Money::from_cents(MAX_TENDER_AMOUNT + 1)).is_err());
    }

    #[test]
    fn test_validate_price_upper_bound() {
        assert!(validate_price(Money::from_cents(MAX_UNIT_PRICE)).is_ok());
        assert!(matches!(
            validate_price(Money::from_cents(MAX_UNIT_PRICE + 1)),
            Err(ValidationError::OutOfRange { max: MAX_UNIT_PRICE, .. })
        ));
        assert!(validate_price(Money::from_cents(i64::MAX / 2)).is_err());
    }

    #[test]
    fn test_validate_discount_value() {
        assert!(validate_discount_value(&DiscountValue::percent(100)).is_ok());
        assert!(validate_discount_value(&DiscountValue::Percentage {
            value: Percentage::from_bps(10_001)
        })
        .is_err());
        assert!(validate_discount_value(&DiscountValue::fixed_cents(-1)).is_err());
        assert!(validate_discount_value(&DiscountValue::fixed_cents(MAX_UNIT_PRICE)).is_ok());
        assert!(validate_discount_value(&DiscountValue::fixed_cents(MAX_UNIT_PRICE + 1)).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(800).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_validate_coupon_window() {
        let mut c = coupon(CouponKind::Fixed {
            amount: Money::from_cents(500),
        });
        assert!(validate_coupon(&c).is_ok());

        c.end_date = c.start_date - Duration::days(1);
        assert!(validate_coupon(&c).is_err());
    }

    #[test]
    fn test_validate_coupon_buy_x_get_y_quantities() {
        let c = coupon(CouponKind::BuyXGetY {
            buy_quantity: 0,
            get_quantity: 1,
            categories: None,
        });
        assert!(validate_coupon(&c).is_err());
    }

    #[test]
    fn test_validate_coupon_category_requires_categories() {
        let c = coupon(CouponKind::CategoryDiscount {
            categories: vec![],
            discount: DiscountValue::percent(15),
            maximum_discount: None,
        });
        assert!(validate_coupon(&c).is_err());
    }

    #[test]
    fn test_validate_coupon_usage_count_within_limit() {
        let mut c = coupon(CouponKind::Percentage {
            percent: Percentage::from_percent(10),
            maximum_discount: None,
        });
        c.usage_limit = Some(2);
        c.usage_count = 3;
        assert!(validate_coupon(&c).is_err());
    }
}
