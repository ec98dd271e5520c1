//! End-to-end checkout scenarios through the session command surface.

use chrono::{DateTime, TimeZone, Utc};

use checkout_core::cart::LineItem;
use checkout_core::config::PricingConfig;
use checkout_core::coupon::InMemoryCouponCatalog;
use checkout_core::ports::{CollectingSink, FixedClock};
use checkout_core::{
    CheckoutSession, CoreError, CouponValidationError, DiscountValue, Money, TenderKind,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 15, 30, 0).unwrap()
}

fn session() -> CheckoutSession {
    CheckoutSession::new(
        PricingConfig::default(),
        InMemoryCouponCatalog::with_defaults(now()),
    )
    .with_clock(FixedClock(now()))
}

fn line(id: &str, cents: i64, qty: i64) -> LineItem {
    LineItem::new(id, format!("Item {}", id), Money::from_cents(cents), qty, "general")
}

/// $100 subtotal, $5 cart discount, SAVE10, 8% tax.
fn reference_cart() -> CheckoutSession {
    let mut s = session();
    s.add_item(line("jacket", 10000, 1)).unwrap();
    s.apply_cart_discount(DiscountValue::fixed_cents(500), None, false)
        .unwrap();
    s.apply_coupon("SAVE10").unwrap();
    s
}

#[test]
fn reference_scenario_totals() {
    let totals = reference_cart().totals();

    assert_eq!(totals.subtotal, Money::from_cents(10000));
    assert_eq!(totals.item_discounts, Money::zero());
    assert_eq!(totals.cart_discount, Money::from_cents(500));
    assert_eq!(totals.coupon_discounts, Money::from_cents(1000));
    assert_eq!(totals.total_savings, Money::from_cents(1500));
    assert_eq!(totals.taxable_base, Money::from_cents(8500));
    assert_eq!(totals.tax, Money::from_cents(680));
    assert_eq!(totals.total, Money::from_cents(9180));
}

#[test]
fn split_tender_settles_with_no_change() {
    let sink = CollectingSink::new();
    let mut s = reference_cart().with_sink(sink.clone());

    s.add_tender(TenderKind::Cash, Money::from_cents(5000)).unwrap();
    let totals = s.add_tender(TenderKind::Card, Money::from_cents(4180)).unwrap();
    assert!(totals.remaining.is_zero());
    assert!(totals.change.is_zero());

    let sale = s.settle().unwrap();
    assert_eq!(sale.transaction.total, Money::from_cents(9180));
    assert!(sale.transaction.change.is_zero());
    assert_eq!(sale.transaction.tenders.len(), 2);
    assert_eq!(sale.transaction.coupons[0].code, "SAVE10");
    assert!(sale.transaction.receipt_number.starts_with("20261018-153000-"));

    let delivered = sink.transactions();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0], sale.transaction);
}

#[test]
fn short_payment_reports_remaining_balance() {
    let mut s = reference_cart();
    s.add_tender(TenderKind::Cash, Money::from_cents(4000)).unwrap();

    let err = s.settle().unwrap_err();
    assert_eq!(
        err,
        CoreError::InsufficientPayment {
            total: Money::from_cents(9180),
            paid: Money::from_cents(4000),
            remaining: Money::from_cents(5180),
        }
    );
    assert_eq!(s.totals().remaining, Money::from_cents(5180));
    assert_eq!(s.tenders().len(), 1);
}

#[test]
fn buy_two_get_one_frees_one_unit() {
    let mut s = session();
    s.add_item(line("soda", 1000, 3)).unwrap();
    let update = s.apply_coupon("B2G1").unwrap();

    assert_eq!(update.totals.coupon_discounts, Money::from_cents(1000));
}

#[test]
fn removing_qualifying_item_detaches_coupon() {
    let mut s = session();
    s.add_item(line("a", 2000, 1)).unwrap();
    s.add_item(line("b", 1000, 1)).unwrap();
    s.apply_coupon("WELCOME5").unwrap();
    let with_coupon = s.totals();
    assert_eq!(with_coupon.coupon_discounts, Money::from_cents(500));

    // $20.00 left, below the $25.00 minimum
    let update = s.remove_item("b").unwrap();
    assert!(matches!(
        update.detached_coupons.as_slice(),
        [CouponValidationError::BelowMinimum { .. }]
    ));
    assert!(s.applied_coupons().is_empty());

    let without_b = with_coupon.subtotal - Money::from_cents(1000);
    assert_eq!(update.totals.subtotal, without_b);
    assert_eq!(
        with_coupon.total_savings - update.totals.total_savings,
        Money::from_cents(500)
    );
}

#[test]
fn totals_are_idempotent() {
    let s = reference_cart();
    assert_eq!(s.totals(), s.totals());
}

#[test]
fn savings_never_exceed_subtotal() {
    let mut s = session();
    s.add_item(line("a", 300, 1)).unwrap();
    s.apply_item_discount("a", DiscountValue::fixed_cents(250))
        .unwrap();
    s.apply_cart_discount(DiscountValue::percent(100), None, false)
        .unwrap();
    let update = s.apply_coupon("SAVE10").unwrap();

    assert!(update.totals.total_savings <= update.totals.subtotal);
    assert!(update.totals.taxable_base.is_zero());
    assert!(update.totals.total.is_zero());
}
