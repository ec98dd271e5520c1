//! # Coupon Engine
//!
//! Validates coupons against the cart, computes what each one is worth and
//! re-validates the applied set after every cart change.
//!
//! ## Validation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_coupon("save10")                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. exists & active ──────────── NotFound / Inactive                    │
//! │  2. start ≤ now ≤ end ────────── NotStarted / Expired                   │
//! │  3. usage_count < usage_limit ── UsageExhausted                         │
//! │  4. subtotal ≥ minimum ───────── BelowMinimum                           │
//! │  5. not already applied ──────── AlreadyApplied                         │
//! │  6. stacking with coupons ────── StackingConflict                       │
//! │  7. stacking with discounts ──── DiscountConflict                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  first failure wins; nothing is attached on failure                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stacking
//! Each coupon is computed on its own against the original eligible
//! subtotal. The combined amount is then capped at the tightest
//! `max_stacking_value` of the applied set (a share of the cart subtotal),
//! and the cap is handed out in the order the coupons were applied.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::model::{AppliedCoupon, Coupon, CouponKind};
use crate::cart::Cart;
use crate::discount;
use crate::error::CouponValidationError;
use crate::money::{allocate_in_order, Money};
use crate::ports::CouponCatalog;

/// Everything a coupon is validated against.
#[derive(Debug, Clone, Copy)]
pub struct CouponContext<'a> {
    pub cart: &'a Cart,
    /// Coupons already on the cart, in application order.
    pub applied: &'a [AppliedCoupon],
    /// Whether a cart-level discount is currently in effect.
    pub cart_discount_active: bool,
    pub now: DateTime<Utc>,
}

// =============================================================================
// Validation
// =============================================================================

/// Looks up `code` in the catalog and validates it against the cart.
///
/// Returns the catalog's current definition on success.
pub fn validate(
    catalog: &dyn CouponCatalog,
    code: &str,
    ctx: &CouponContext<'_>,
) -> Result<Coupon, CouponValidationError> {
    let code = Coupon::normalize_code(code);
    let coupon = catalog
        .find(&code)
        .ok_or_else(|| CouponValidationError::NotFound(code.clone()))?;
    check(&coupon, ctx)?;
    Ok(coupon)
}

/// Validates a known coupon definition against the cart.
pub fn check(coupon: &Coupon, ctx: &CouponContext<'_>) -> Result<(), CouponValidationError> {
    let code = &coupon.code;

    if !coupon.is_active {
        return Err(CouponValidationError::Inactive(code.clone()));
    }

    if ctx.now < coupon.start_date {
        return Err(CouponValidationError::NotStarted(code.clone()));
    }
    if ctx.now > coupon.end_date {
        return Err(CouponValidationError::Expired(code.clone()));
    }

    if let Some(limit) = coupon.usage_limit {
        if coupon.usage_count >= limit {
            return Err(CouponValidationError::UsageExhausted {
                code: code.clone(),
                limit,
            });
        }
    }

    if let Some(minimum) = coupon.minimum_purchase {
        let subtotal = ctx.cart.subtotal();
        if subtotal < minimum {
            return Err(CouponValidationError::BelowMinimum {
                code: code.clone(),
                minimum,
                subtotal,
            });
        }
    }

    if ctx.applied.iter().any(|a| a.code() == code) {
        return Err(CouponValidationError::AlreadyApplied(code.clone()));
    }

    if let Some(first) = ctx.applied.first() {
        if !coupon.stacking_rules.allow_with_other_coupons {
            return Err(CouponValidationError::StackingConflict {
                code: code.clone(),
                conflicting: first.code().to_string(),
            });
        }
        if let Some(blocking) = ctx
            .applied
            .iter()
            .find(|a| !a.coupon.stacking_rules.allow_with_other_coupons)
        {
            return Err(CouponValidationError::StackingConflict {
                code: code.clone(),
                conflicting: blocking.code().to_string(),
            });
        }
    }

    if ctx.cart_discount_active && !coupon.stacking_rules.allow_with_discounts {
        return Err(CouponValidationError::DiscountConflict(code.clone()));
    }

    Ok(())
}

// =============================================================================
// Discount Computation
// =============================================================================

/// What `coupon` is worth on its own against `cart`, before the stacking cap.
///
/// ## Rules
/// - Percentage: share of the applicable subtotal, capped by
///   `maximum_discount`
/// - Fixed: `min(amount, applicable subtotal)`
/// - Buy X get Y: matching units sorted by price (highest first), grouped
///   into `buy + get` units; the `get` cheapest of each full group are free
/// - Category: discount on the matching lines only; zero when none match
pub fn compute_discount(coupon: &Coupon, cart: &Cart) -> Money {
    let applicable: Money = cart
        .items()
        .iter()
        .filter(|item| coupon.applies_to(item))
        .map(|item| item.line_total())
        .sum();

    let amount = match &coupon.kind {
        CouponKind::Percentage {
            percent,
            maximum_discount,
        } => cap(applicable.percent_of(*percent), *maximum_discount),
        CouponKind::Fixed { amount } => *amount,
        CouponKind::BuyXGetY {
            buy_quantity,
            get_quantity,
            ..
        } => buy_x_get_y(coupon, cart, *buy_quantity, *get_quantity),
        CouponKind::CategoryDiscount {
            discount: value,
            maximum_discount,
            ..
        } => cap(discount::resolve(applicable, value), *maximum_discount),
    };

    amount.clamp_to(applicable)
}

fn cap(amount: Money, maximum: Option<Money>) -> Money {
    match maximum {
        Some(max) => amount.min(max),
        None => amount,
    }
}

fn buy_x_get_y(coupon: &Coupon, cart: &Cart, buy: u32, get: u32) -> Money {
    let group = (buy + get) as usize;
    if buy == 0 || get == 0 {
        return Money::zero();
    }

    let mut units: Vec<Money> = cart
        .items()
        .iter()
        .filter(|item| coupon.applies_to(item))
        .flat_map(|item| {
            std::iter::repeat(item.unit_price).take(item.quantity.max(0) as usize)
        })
        .collect();
    units.sort_unstable_by(|a, b| b.cmp(a));

    units
        .chunks_exact(group)
        .flat_map(|chunk| chunk[buy as usize..].iter())
        .sum()
}

/// Recomputes every applied coupon's amount and applies the stacking cap.
pub fn reprice(applied: &mut [AppliedCoupon], cart: &Cart) {
    let raw: Vec<Money> = applied
        .iter()
        .map(|a| compute_discount(&a.coupon, cart))
        .collect();

    let ceiling = applied
        .iter()
        .filter_map(|a| a.coupon.stacking_rules.max_stacking_value)
        .min()
        .map(|pct| cart.subtotal().percent_of(pct));

    let amounts = match ceiling {
        Some(ceiling) => allocate_in_order(&raw, ceiling),
        None => raw,
    };

    for (coupon, amount) in applied.iter_mut().zip(amounts) {
        coupon.discount_amount = amount;
    }
}

// =============================================================================
// Re-validation
// =============================================================================

/// Re-validates the applied coupons after a cart change.
///
/// Each coupon is re-read from the catalog and checked against the coupons
/// kept before it. Survivors are repriced; the rest are returned as the
/// reasons they were detached.
pub fn revalidate(
    catalog: &dyn CouponCatalog,
    applied: &[AppliedCoupon],
    cart: &Cart,
    cart_discount_active: bool,
    now: DateTime<Utc>,
) -> (Vec<AppliedCoupon>, Vec<CouponValidationError>) {
    let mut kept: Vec<AppliedCoupon> = Vec::with_capacity(applied.len());
    let mut detached = Vec::new();

    for current in applied {
        let ctx = CouponContext {
            cart,
            applied: &kept,
            cart_discount_active,
            now,
        };

        match validate(catalog, current.code(), &ctx) {
            Ok(coupon) => kept.push(AppliedCoupon {
                coupon,
                discount_amount: Money::zero(),
                applied_at: current.applied_at,
            }),
            Err(reason) => {
                warn!(code = %current.code(), %reason, "Coupon detached");
                detached.push(reason);
            }
        }
    }

    reprice(&mut kept, cart);
    debug!(kept = kept.len(), detached = detached.len(), "Coupons re-validated");
    (kept, detached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::LineItem;
    use crate::coupon::catalog::InMemoryCouponCatalog;
    use crate::coupon::model::StackingRules;
    use crate::types::{DiscountValue, Percentage};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn coupon(code: &str, kind: CouponKind) -> Coupon {
        Coupon {
            code: code.to_string(),
            name: code.to_string(),
            description: String::new(),
            kind,
            minimum_purchase: None,
            start_date: now() - Duration::days(1),
            end_date: now() + Duration::days(1),
            usage_limit: None,
            usage_count: 0,
            is_active: true,
            stacking_rules: StackingRules::default(),
        }
    }

    fn percent(code: &str, pct: u32) -> Coupon {
        coupon(
            code,
            CouponKind::Percentage {
                percent: Percentage::from_percent(pct),
                maximum_discount: None,
            },
        )
    }

    fn cart_of(lines: &[(&str, i64, i64, &str)]) -> Cart {
        let mut cart = Cart::new();
        for (id, price, qty, category) in lines {
            cart.add_item(LineItem::new(
                *id,
                format!("Item {}", id),
                Money::from_cents(*price),
                *qty,
                *category,
            ))
            .unwrap();
        }
        cart
    }

    fn applied(coupon: Coupon) -> AppliedCoupon {
        AppliedCoupon {
            coupon,
            discount_amount: Money::zero(),
            applied_at: now(),
        }
    }

    fn ctx<'a>(cart: &'a Cart, applied: &'a [AppliedCoupon]) -> CouponContext<'a> {
        CouponContext {
            cart,
            applied,
            cart_discount_active: false,
            now: now(),
        }
    }

    #[test]
    fn test_validation_order_inactive_before_expired() {
        let cart = cart_of(&[("1", 1000, 1, "misc")]);
        let mut c = percent("OLD", 10);
        c.is_active = false;
        c.end_date = now() - Duration::hours(1);
        assert_eq!(
            check(&c, &ctx(&cart, &[])),
            Err(CouponValidationError::Inactive("OLD".to_string()))
        );
    }

    #[test]
    fn test_window_and_usage() {
        let cart = cart_of(&[("1", 1000, 1, "misc")]);

        let mut early = percent("EARLY", 10);
        early.start_date = now() + Duration::hours(1);
        assert!(matches!(
            check(&early, &ctx(&cart, &[])),
            Err(CouponValidationError::NotStarted(_))
        ));

        let mut used = percent("USED", 10);
        used.usage_limit = Some(5);
        used.usage_count = 5;
        assert_eq!(
            check(&used, &ctx(&cart, &[])),
            Err(CouponValidationError::UsageExhausted {
                code: "USED".to_string(),
                limit: 5
            })
        );
    }

    #[test]
    fn test_minimum_purchase() {
        let cart = cart_of(&[("1", 2000, 1, "misc")]);
        let mut c = coupon(
            "WELCOME5",
            CouponKind::Fixed {
                amount: Money::from_cents(500),
            },
        );
        c.minimum_purchase = Some(Money::from_cents(2500));
        assert!(matches!(
            check(&c, &ctx(&cart, &[])),
            Err(CouponValidationError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn test_stacking_requires_both_sides_to_allow() {
        let cart = cart_of(&[("1", 10000, 1, "misc")]);

        let mut stackable = percent("A", 10);
        stackable.stacking_rules.allow_with_other_coupons = true;
        let exclusive = percent("B", 5);

        // New coupon is exclusive.
        let on_cart = [applied(stackable.clone())];
        assert!(matches!(
            check(&exclusive, &ctx(&cart, &on_cart)),
            Err(CouponValidationError::StackingConflict { .. })
        ));

        // Applied coupon is exclusive.
        let on_cart = [applied(exclusive)];
        assert_eq!(
            check(&stackable, &ctx(&cart, &on_cart)),
            Err(CouponValidationError::StackingConflict {
                code: "A".to_string(),
                conflicting: "B".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_and_discount_conflict() {
        let cart = cart_of(&[("1", 10000, 1, "misc")]);
        let c = percent("SAVE10", 10);
        let on_cart = [applied(c.clone())];
        assert_eq!(
            check(&c, &ctx(&cart, &on_cart)),
            Err(CouponValidationError::AlreadyApplied("SAVE10".to_string()))
        );

        let mut no_discounts = percent("SOLO", 10);
        no_discounts.stacking_rules.allow_with_discounts = false;
        let with_discount = CouponContext {
            cart_discount_active: true,
            ..ctx(&cart, &[])
        };
        assert_eq!(
            check(&no_discounts, &with_discount),
            Err(CouponValidationError::DiscountConflict("SOLO".to_string()))
        );
    }

    #[test]
    fn test_validate_normalizes_code() {
        let mut catalog = InMemoryCouponCatalog::new();
        catalog.create(percent("SAVE10", 10)).unwrap();
        let cart = cart_of(&[("1", 1000, 1, "misc")]);
        let found = validate(&catalog, " save10 ", &ctx(&cart, &[])).unwrap();
        assert_eq!(found.code, "SAVE10");

        assert_eq!(
            validate(&catalog, "nope", &ctx(&cart, &[])),
            Err(CouponValidationError::NotFound("NOPE".to_string()))
        );
    }

    #[test]
    fn test_percentage_with_maximum() {
        let cart = cart_of(&[("1", 30000, 1, "misc")]);
        let c = coupon(
            "BIG20",
            CouponKind::Percentage {
                percent: Percentage::from_percent(20),
                maximum_discount: Some(Money::from_cents(5000)),
            },
        );
        assert_eq!(compute_discount(&c, &cart).cents(), 5000);
    }

    #[test]
    fn test_fixed_is_capped_at_subtotal() {
        let cart = cart_of(&[("1", 300, 1, "misc")]);
        let c = coupon(
            "FIVE",
            CouponKind::Fixed {
                amount: Money::from_cents(500),
            },
        );
        assert_eq!(compute_discount(&c, &cart).cents(), 300);
    }

    #[test]
    fn test_buy_two_get_one() {
        let c = coupon(
            "B2G1",
            CouponKind::BuyXGetY {
                buy_quantity: 2,
                get_quantity: 1,
                categories: None,
            },
        );

        let cart = cart_of(&[("1", 1000, 3, "misc")]);
        assert_eq!(compute_discount(&c, &cart).cents(), 1000);

        // Units span lines; the cheapest of each full group is free.
        let cart = cart_of(&[("1", 1000, 2, "misc"), ("2", 400, 2, "misc"), ("3", 700, 1, "misc")]);
        // sorted: 1000 1000 700 | 400 400 → one full group, 700 free
        assert_eq!(compute_discount(&c, &cart).cents(), 700);

        let cart = cart_of(&[("1", 1000, 2, "misc")]);
        assert!(compute_discount(&c, &cart).is_zero());
    }

    #[test]
    fn test_buy_x_get_y_respects_categories() {
        let c = coupon(
            "BOGO",
            CouponKind::BuyXGetY {
                buy_quantity: 1,
                get_quantity: 1,
                categories: Some(vec!["bakery".to_string()]),
            },
        );
        let cart = cart_of(&[("1", 500, 2, "bakery"), ("2", 2000, 2, "deli")]);
        assert_eq!(compute_discount(&c, &cart).cents(), 500);
    }

    #[test]
    fn test_category_discount() {
        let c = coupon(
            "FRESH15",
            CouponKind::CategoryDiscount {
                categories: vec!["produce".to_string()],
                discount: DiscountValue::percent(15),
                maximum_discount: None,
            },
        );
        let cart = cart_of(&[("1", 2000, 1, "Produce"), ("2", 5000, 1, "grocery")]);
        assert_eq!(compute_discount(&c, &cart).cents(), 300);

        let no_match = cart_of(&[("2", 5000, 1, "grocery")]);
        assert!(compute_discount(&c, &no_match).is_zero());
    }

    #[test]
    fn test_stacking_cap_allocated_in_order() {
        let cart = cart_of(&[("1", 10000, 1, "misc")]);

        let mut first = percent("A", 15);
        first.stacking_rules.allow_with_other_coupons = true;
        first.stacking_rules.max_stacking_value = Some(Percentage::from_percent(20));
        let mut second = percent("B", 10);
        second.stacking_rules.allow_with_other_coupons = true;

        let mut on_cart = vec![applied(first), applied(second)];
        reprice(&mut on_cart, &cart);

        assert_eq!(on_cart[0].discount_amount.cents(), 1500);
        assert_eq!(on_cart[1].discount_amount.cents(), 500);
    }

    #[test]
    fn test_revalidate_detaches_below_minimum() {
        let mut catalog = InMemoryCouponCatalog::new();
        let mut c = percent("MIN50", 10);
        c.minimum_purchase = Some(Money::from_cents(5000));
        catalog.create(c.clone()).unwrap();

        let cart = cart_of(&[("1", 4000, 1, "misc")]);
        let (kept, detached) = revalidate(&catalog, &[applied(c)], &cart, false, now());

        assert!(kept.is_empty());
        assert!(matches!(
            detached.as_slice(),
            [CouponValidationError::BelowMinimum { .. }]
        ));
    }

    #[test]
    fn test_revalidate_uses_current_definition() {
        let mut catalog = InMemoryCouponCatalog::new();
        let c = percent("SAVE10", 10);
        catalog.create(c.clone()).unwrap();

        let mut changed = c.clone();
        changed.kind = CouponKind::Percentage {
            percent: Percentage::from_percent(20),
            maximum_discount: None,
        };
        catalog.update(changed).unwrap();

        let cart = cart_of(&[("1", 10000, 1, "misc")]);
        let (kept, detached) = revalidate(&catalog, &[applied(c)], &cart, false, now());
        assert!(detached.is_empty());
        assert_eq!(kept[0].discount_amount.cents(), 2000);
    }
}
