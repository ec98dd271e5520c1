//! Coupon definitions and the applied-coupon snapshot.
//!
//! ## Serialized Shape
//! The coupon kind is flattened into the coupon, tagged by `type`:
//! ```json
//! {
//!   "code": "SAVE10",
//!   "name": "Save 10%",
//!   "type": "percentage",
//!   "percent": 1000,
//!   "maximumDiscount": null,
//!   "startDate": "2026-01-01T00:00:00Z",
//!   "endDate": "2026-12-31T23:59:59Z",
//!   "usageCount": 0,
//!   "isActive": true,
//!   "stackingRules": { "allowWithOtherCoupons": true, "allowWithDiscounts": true }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::cart::LineItem;
use crate::money::Money;
use crate::types::{DiscountValue, Percentage};

// =============================================================================
// Coupon Kind
// =============================================================================

/// What a coupon does. Each variant carries only the fields it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CouponKind {
    /// Percentage off the applicable subtotal, optionally capped.
    Percentage {
        percent: Percentage,
        #[serde(default)]
        maximum_discount: Option<Money>,
    },

    /// Fixed amount off, never more than the applicable subtotal.
    Fixed { amount: Money },

    /// Buy `buy_quantity` units, get `get_quantity` of the cheapest free.
    ///
    /// Without categories every line is eligible.
    BuyXGetY {
        buy_quantity: u32,
        get_quantity: u32,
        #[serde(default)]
        categories: Option<Vec<String>>,
    },

    /// A discount restricted to lines in the given categories.
    CategoryDiscount {
        categories: Vec<String>,
        discount: DiscountValue,
        #[serde(default)]
        maximum_discount: Option<Money>,
    },
}

impl CouponKind {
    /// The storage tag of this kind.
    pub fn tag(&self) -> CouponKindTag {
        match self {
            CouponKind::Percentage { .. } => CouponKindTag::Percentage,
            CouponKind::Fixed { .. } => CouponKindTag::Fixed,
            CouponKind::BuyXGetY { .. } => CouponKindTag::BuyXGetY,
            CouponKind::CategoryDiscount { .. } => CouponKindTag::CategoryDiscount,
        }
    }

    /// Categories the coupon is restricted to, if any.
    pub fn categories(&self) -> Option<&[String]> {
        match self {
            CouponKind::BuyXGetY { categories, .. } => categories.as_deref(),
            CouponKind::CategoryDiscount { categories, .. } => Some(categories),
            _ => None,
        }
    }
}

/// Discriminant of [`CouponKind`], stored in the `coupons.kind` column.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CouponKindTag {
    Percentage,
    Fixed,
    BuyXGetY,
    CategoryDiscount,
}

impl fmt::Display for CouponKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouponKindTag::Percentage => write!(f, "percentage"),
            CouponKindTag::Fixed => write!(f, "fixed"),
            CouponKindTag::BuyXGetY => write!(f, "buy_x_get_y"),
            CouponKindTag::CategoryDiscount => write!(f, "category_discount"),
        }
    }
}

// =============================================================================
// Stacking Rules
// =============================================================================

fn default_true() -> bool {
    true
}

/// How a coupon combines with other coupons and with cart discounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackingRules {
    /// Both this coupon and every other applied coupon must allow stacking.
    #[serde(default)]
    pub allow_with_other_coupons: bool,

    /// When false the coupon is refused (or detached) while a cart discount
    /// is active.
    #[serde(default = "default_true")]
    pub allow_with_discounts: bool,

    /// Cap on the combined coupon discount, as a share of the cart subtotal.
    #[serde(default)]
    pub max_stacking_value: Option<Percentage>,
}

impl Default for StackingRules {
    fn default() -> Self {
        StackingRules {
            allow_with_other_coupons: false,
            allow_with_discounts: true,
            max_stacking_value: None,
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// A coupon definition as held by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Unique, stored upper-case.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub kind: CouponKind,
    #[serde(default)]
    pub minimum_purchase: Option<Money>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub stacking_rules: StackingRules,
}

impl Coupon {
    /// Canonical form of a code: trimmed and upper-cased.
    ///
    /// ```rust
    /// use checkout_core::coupon::Coupon;
    ///
    /// assert_eq!(Coupon::normalize_code("  save10 "), "SAVE10");
    /// ```
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_ascii_uppercase()
    }

    /// Whether `now` falls inside the validity window (both ends inclusive).
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    /// Whether the usage limit has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.usage_count >= limit)
    }

    /// Whether a line counts toward this coupon's applicable subtotal.
    pub fn applies_to(&self, item: &LineItem) -> bool {
        match self.kind.categories() {
            Some(categories) => categories.iter().any(|c| item.in_category(c)),
            None => true,
        }
    }
}

// =============================================================================
// Applied Coupon
// =============================================================================

/// A coupon attached to the cart, with the discount it currently yields.
///
/// The coupon is a snapshot; re-validation replaces it with the catalog's
/// current definition on every cart change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub coupon: Coupon,
    /// Discount after the stacking cap has been allocated.
    pub discount_amount: Money,
    pub applied_at: DateTime<Utc>,
}

impl AppliedCoupon {
    pub fn code(&self) -> &str {
        &self.coupon.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn coupon(kind: CouponKind) -> Coupon {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Coupon {
            code: "TEST".to_string(),
            name: "Test".to_string(),
            description: String::new(),
            kind,
            minimum_purchase: None,
            start_date: start,
            end_date: start + Duration::days(30),
            usage_limit: Some(2),
            usage_count: 0,
            is_active: true,
            stacking_rules: StackingRules::default(),
        }
    }

    #[test]
    fn test_window_is_inclusive() {
        let c = coupon(CouponKind::Fixed {
            amount: Money::from_cents(500),
        });
        assert!(c.is_within_window(c.start_date));
        assert!(c.is_within_window(c.end_date));
        assert!(!c.is_within_window(c.end_date + Duration::seconds(1)));
        assert!(!c.is_within_window(c.start_date - Duration::seconds(1)));
    }

    #[test]
    fn test_exhaustion() {
        let mut c = coupon(CouponKind::Fixed {
            amount: Money::from_cents(500),
        });
        assert!(!c.is_exhausted());
        c.usage_count = 2;
        assert!(c.is_exhausted());
        c.usage_limit = None;
        assert!(!c.is_exhausted());
    }

    #[test]
    fn test_applies_to_categories() {
        let c = coupon(CouponKind::CategoryDiscount {
            categories: vec!["Produce".to_string()],
            discount: DiscountValue::percent(15),
            maximum_discount: None,
        });
        let apple = LineItem::new("a", "Apple", Money::from_cents(100), 1, "produce");
        let soap = LineItem::new("s", "Soap", Money::from_cents(100), 1, "household");
        assert!(c.applies_to(&apple));
        assert!(!c.applies_to(&soap));
    }

    #[test]
    fn test_coupon_json_shape() {
        let c = coupon(CouponKind::BuyXGetY {
            buy_quantity: 2,
            get_quantity: 1,
            categories: None,
        });
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "buy_x_get_y");
        assert_eq!(json["buyQuantity"], 2);
        assert_eq!(json["stackingRules"]["allowWithDiscounts"], true);

        let parsed: Coupon = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn test_kind_tag_display() {
        assert_eq!(CouponKindTag::BuyXGetY.to_string(), "buy_x_get_y");
        let kind = CouponKind::Percentage {
            percent: Percentage::from_percent(10),
            maximum_discount: None,
        };
        assert_eq!(kind.tag(), CouponKindTag::Percentage);
    }
}
