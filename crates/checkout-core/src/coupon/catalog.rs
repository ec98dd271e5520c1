//! In-memory coupon catalog and the default coupon set.
//!
//! The register loads this catalog from SQLite at startup and keeps the two
//! in step; the pricing core only ever reads it through [`CouponCatalog`].

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use tracing::info;

use super::model::{Coupon, CouponKind, StackingRules};
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::ports::CouponCatalog;
use crate::types::{DiscountValue, Percentage};
use crate::validation::validate_coupon;

/// Coupon definitions keyed by upper-case code.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCouponCatalog {
    coupons: BTreeMap<String, Coupon>,
}

impl InMemoryCouponCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding [`default_coupons`].
    pub fn with_defaults(now: DateTime<Utc>) -> Self {
        let mut catalog = Self::new();
        catalog.reset_to_defaults(now);
        catalog
    }

    /// Builds a catalog from stored definitions.
    pub fn from_coupons(coupons: impl IntoIterator<Item = Coupon>) -> Self {
        let coupons = coupons
            .into_iter()
            .map(|mut c| {
                c.code = Coupon::normalize_code(&c.code);
                (c.code.clone(), c)
            })
            .collect();
        InMemoryCouponCatalog { coupons }
    }

    /// Adds a new coupon.
    ///
    /// ## Errors
    /// - Invalid definition
    /// - `Duplicate` if the code exists
    pub fn create(&mut self, mut coupon: Coupon) -> CoreResult<Coupon> {
        validate_coupon(&coupon)?;
        coupon.code = Coupon::normalize_code(&coupon.code);
        if self.coupons.contains_key(&coupon.code) {
            return Err(ValidationError::Duplicate {
                field: "coupon code".to_string(),
                value: coupon.code,
            }
            .into());
        }
        info!(code = %coupon.code, kind = %coupon.kind.tag(), "Coupon created");
        self.coupons.insert(coupon.code.clone(), coupon.clone());
        Ok(coupon)
    }

    /// Replaces an existing coupon definition.
    ///
    /// The stored `usage_count` is kept; only settled sales move it.
    pub fn update(&mut self, mut coupon: Coupon) -> CoreResult<Coupon> {
        coupon.code = Coupon::normalize_code(&coupon.code);
        let Some(existing) = self.coupons.get_mut(&coupon.code) else {
            return Err(ValidationError::Unknown {
                field: "coupon code".to_string(),
                value: coupon.code,
            }
            .into());
        };

        coupon.usage_count = existing.usage_count;
        validate_coupon(&coupon)?;
        *existing = coupon.clone();
        info!(code = %coupon.code, "Coupon updated");
        Ok(coupon)
    }

    /// Removes a coupon.
    pub fn delete(&mut self, code: &str) -> CoreResult<Coupon> {
        let code = Coupon::normalize_code(code);
        let removed = self.coupons.remove(&code).ok_or(ValidationError::Unknown {
            field: "coupon code".to_string(),
            value: code.clone(),
        })?;
        info!(code = %code, "Coupon deleted");
        Ok(removed)
    }

    /// All coupons ordered by code.
    pub fn list(&self) -> Vec<Coupon> {
        self.coupons.values().cloned().collect()
    }

    /// Replaces the catalog with [`default_coupons`].
    pub fn reset_to_defaults(&mut self, now: DateTime<Utc>) {
        self.coupons = default_coupons(now)
            .into_iter()
            .map(|c| (c.code.clone(), c))
            .collect();
        info!(count = self.coupons.len(), "Coupon catalog reset to defaults");
    }

    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }
}

impl CouponCatalog for InMemoryCouponCatalog {
    fn find(&self, code: &str) -> Option<Coupon> {
        self.coupons.get(&Coupon::normalize_code(code)).cloned()
    }

    fn record_redemption(&mut self, code: &str) {
        if let Some(coupon) = self.coupons.get_mut(&Coupon::normalize_code(code)) {
            coupon.usage_count = coupon.usage_count.saturating_add(1);
        }
    }
}

// =============================================================================
// Default Coupons
// =============================================================================

/// The stock coupon set, valid from `now` for one year.
///
/// | Code     | Kind                         | Notes                       |
/// |----------|------------------------------|-----------------------------|
/// | SAVE10   | 10 %                         | stacks, cap 100 %           |
/// | WELCOME5 | $5.00 off                    | minimum $25.00              |
/// | B2G1     | buy 2 get 1                  |                             |
/// | BOGO     | buy 1 get 1                  |                             |
/// | FRESH15  | 15 % off produce             |                             |
/// | BIG20    | 20 %, at most $50.00         | minimum $100.00             |
pub fn default_coupons(now: DateTime<Utc>) -> Vec<Coupon> {
    let end = now + Duration::days(365);
    let base = |code: &str, name: &str, description: &str, kind: CouponKind| Coupon {
        code: code.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        kind,
        minimum_purchase: None,
        start_date: now,
        end_date: end,
        usage_limit: None,
        usage_count: 0,
        is_active: true,
        stacking_rules: StackingRules::default(),
    };

    let mut save10 = base(
        "SAVE10",
        "Save 10%",
        "10% off the whole order",
        CouponKind::Percentage {
            percent: Percentage::from_percent(10),
            maximum_discount: None,
        },
    );
    save10.stacking_rules = StackingRules {
        allow_with_other_coupons: true,
        allow_with_discounts: true,
        max_stacking_value: Some(Percentage::full()),
    };

    let mut welcome5 = base(
        "WELCOME5",
        "Welcome $5",
        "$5 off orders of $25 or more",
        CouponKind::Fixed {
            amount: Money::from_cents(500),
        },
    );
    welcome5.minimum_purchase = Some(Money::from_cents(2500));

    let b2g1 = base(
        "B2G1",
        "Buy 2 Get 1",
        "Every third item free (cheapest of each group)",
        CouponKind::BuyXGetY {
            buy_quantity: 2,
            get_quantity: 1,
            categories: None,
        },
    );

    let bogo = base(
        "BOGO",
        "Buy One Get One",
        "Every second item free (cheapest of each pair)",
        CouponKind::BuyXGetY {
            buy_quantity: 1,
            get_quantity: 1,
            categories: None,
        },
    );

    let fresh15 = base(
        "FRESH15",
        "Fresh 15",
        "15% off produce",
        CouponKind::CategoryDiscount {
            categories: vec!["produce".to_string()],
            discount: DiscountValue::percent(15),
            maximum_discount: None,
        },
    );

    let mut big20 = base(
        "BIG20",
        "Big Spender",
        "20% off orders of $100 or more, up to $50",
        CouponKind::Percentage {
            percent: Percentage::from_percent(20),
            maximum_discount: Some(Money::from_cents(5000)),
        },
    );
    big20.minimum_purchase = Some(Money::from_cents(10000));

    vec![save10, welcome5, b2g1, bogo, fresh15, big20]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_defaults_are_valid() {
        let now = Utc::now();
        for coupon in default_coupons(now) {
            assert!(validate_coupon(&coupon).is_ok(), "{}", coupon.code);
            assert!(coupon.is_within_window(now));
        }
        assert_eq!(InMemoryCouponCatalog::with_defaults(now).len(), 6);
    }

    #[test]
    fn test_crud() {
        let now = Utc::now();
        let mut catalog = InMemoryCouponCatalog::new();
        let mut coupon = default_coupons(now).remove(0);
        coupon.code = "spring".to_string();

        let created = catalog.create(coupon.clone()).unwrap();
        assert_eq!(created.code, "SPRING");
        assert!(catalog.find("Spring").is_some());

        let err = catalog.create(coupon.clone()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Duplicate { .. })
        ));

        coupon.name = "Spring sale".to_string();
        catalog.update(coupon).unwrap();
        assert_eq!(catalog.find("SPRING").unwrap().name, "Spring sale");

        catalog.delete("spring").unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.delete("spring").is_err());
    }

    #[test]
    fn test_record_redemption_counts_usage() {
        let mut catalog = InMemoryCouponCatalog::with_defaults(Utc::now());
        catalog.record_redemption("save10");
        catalog.record_redemption("SAVE10");
        assert_eq!(catalog.find("SAVE10").unwrap().usage_count, 2);
    }

    #[test]
    fn test_update_keeps_usage_count() {
        let mut catalog = InMemoryCouponCatalog::with_defaults(Utc::now());
        catalog.record_redemption("SAVE10");
        catalog.record_redemption("SAVE10");

        let mut edited = catalog.find("SAVE10").unwrap();
        edited.usage_count = 0;
        edited.name = "Ten percent off".to_string();
        let updated = catalog.update(edited).unwrap();

        assert_eq!(updated.usage_count, 2);
        let stored = catalog.find("SAVE10").unwrap();
        assert_eq!(stored.usage_count, 2);
        assert_eq!(stored.name, "Ten percent off");
    }
}
