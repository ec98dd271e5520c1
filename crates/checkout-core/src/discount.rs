//! # Discount Resolver
//!
//! Turns a [`DiscountValue`] into an amount against a base, and holds the
//! single cart-level discount.
//!
//! ```text
//!   base ─────┐
//!             ├──► resolve() ──► amount ∈ [0, base]
//!   value ────┘
//!
//!   Percentage(bps): base × bps / 10000 (half-up), clamped to [0, base]
//!   Fixed(amount):   min(amount, base)
//! ```
//!
//! `requires_override` on a [`CartDiscount`] is a policy marker only; the
//! resolver applies whatever discount it is given. Gating happens in the
//! session before the discount is ever installed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::DiscountValue;

/// Resolves a discount value against `base`.
///
/// ## Example
/// ```rust
/// use checkout_core::discount::resolve;
/// use checkout_core::money::Money;
/// use checkout_core::types::DiscountValue;
///
/// let base = Money::from_cents(10000);
/// assert_eq!(resolve(base, &DiscountValue::percent(10)).cents(), 1000);
/// assert_eq!(resolve(base, &DiscountValue::fixed_cents(500)).cents(), 500);
/// assert_eq!(resolve(base, &DiscountValue::fixed_cents(20000)), base);
/// ```
pub fn resolve(base: Money, value: &DiscountValue) -> Money {
    let base = base.non_negative();
    match value {
        DiscountValue::Percentage { value } => base.percent_of(*value).clamp_to(base),
        DiscountValue::Fixed { value } => value.clamp_to(base),
    }
}

/// The cart-level discount. At most one is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDiscount {
    pub value: DiscountValue,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub requires_override: bool,
    pub applied_at: DateTime<Utc>,
}

impl CartDiscount {
    /// Amount of this discount against `base`.
    pub fn amount(&self, base: Money) -> Money {
        resolve(base, &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Percentage;

    #[test]
    fn test_percentage_is_clamped_to_base() {
        let base = Money::from_cents(9500);
        assert_eq!(resolve(base, &DiscountValue::percent(100)), base);
        assert_eq!(resolve(base, &DiscountValue::percent(0)), Money::zero());
        // Out-of-range values never discount more than the base.
        let over = DiscountValue::Percentage {
            value: Percentage::from_bps(15_000),
        };
        assert_eq!(resolve(base, &over), base);
    }

    #[test]
    fn test_fixed_is_min_of_value_and_base() {
        let base = Money::from_cents(300);
        assert_eq!(resolve(base, &DiscountValue::fixed_cents(500)), base);
        assert_eq!(resolve(base, &DiscountValue::fixed_cents(120)).cents(), 120);
    }

    #[test]
    fn test_negative_base_yields_zero() {
        let base = Money::from_cents(-100);
        assert!(resolve(base, &DiscountValue::percent(50)).is_zero());
        assert!(resolve(base, &DiscountValue::fixed_cents(50)).is_zero());
    }
}
