//! # Totals Aggregator
//!
//! One pure function turns the session's ledgers into every number the
//! register shows or records. Nothing else in the workspace does arithmetic
//! on totals; the tender screen, the settlement check and the transaction
//! record all read a [`Totals`] produced here.
//!
//! ## Calculation
//! ```text
//! subtotal         = Σ(unit price × qty)
//! item_discounts   = Σ(per-line discounts)
//! cart_discount    = resolve(subtotal − item_discounts, cart discount)
//! coupon_discounts = Σ(applied coupons), at most subtotal − item − cart
//! loyalty_discount = min(points × point value, what is still left)
//! total_savings    = item + cart + coupons + loyalty        (≤ subtotal)
//! taxable_base     = subtotal − total_savings               (≥ 0)
//! tax              = taxable_base × tax rate                (half-up, once)
//! total            = taxable_base + tax
//!
//! remaining        = max(0, total − paid)
//! change           = max(0, paid − total)
//! ```
//!
//! ## Worked Example
//! ```text
//! $100.00 subtotal, $5.00 cart discount, SAVE10, 8% tax
//!   cart discount   $5.00
//!   SAVE10         $10.00   (10% of the original $100.00)
//!   savings        $15.00
//!   taxable        $85.00
//!   tax             $6.80
//!   total          $91.80
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::coupon::AppliedCoupon;
use crate::discount::CartDiscount;
use crate::money::{allocate_in_order, Money};
use crate::types::TaxRate;

/// Everything the totals depend on.
#[derive(Debug, Clone, Copy)]
pub struct TotalsInput<'a> {
    pub cart: &'a Cart,
    pub cart_discount: Option<&'a CartDiscount>,
    pub coupons: &'a [AppliedCoupon],
    /// Monetary value of the points being redeemed, before clamping.
    pub loyalty_value: Money,
    pub tax_rate: TaxRate,
    /// Σ tenders recorded so far.
    pub paid: Money,
}

/// One coupon's line in the savings breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CouponSaving {
    pub code: String,
    pub name: String,
    pub amount: Money,
}

/// The full price breakdown of the active sale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Money,
    pub item_discounts: Money,
    pub cart_discount: Money,
    pub coupon_discounts: Money,
    pub coupons: Vec<CouponSaving>,
    pub loyalty_discount: Money,
    pub total_savings: Money,
    pub taxable_base: Money,
    pub tax_rate: TaxRate,
    pub tax: Money,
    pub total: Money,
    pub paid: Money,
    pub remaining: Money,
    pub change: Money,
}

impl Totals {
    /// Whether the recorded tenders cover the total.
    pub fn is_covered(&self) -> bool {
        self.paid >= self.total
    }
}

/// Computes the totals.
///
/// Deterministic: the same input always yields the same `Totals`.
pub fn compute(input: TotalsInput<'_>) -> Totals {
    let subtotal = input.cart.subtotal();
    let item_discounts = input.cart.item_discounts().clamp_to(subtotal);

    let after_items = subtotal.saturating_sub(item_discounts);
    let cart_discount = input
        .cart_discount
        .map(|d| d.amount(after_items))
        .unwrap_or_default();

    let after_cart = after_items.saturating_sub(cart_discount);
    let requested: Vec<Money> = input.coupons.iter().map(|c| c.discount_amount).collect();
    let allocated = allocate_in_order(&requested, after_cart);
    let coupons: Vec<CouponSaving> = input
        .coupons
        .iter()
        .zip(&allocated)
        .map(|(applied, amount)| CouponSaving {
            code: applied.coupon.code.clone(),
            name: applied.coupon.name.clone(),
            amount: *amount,
        })
        .collect();
    let coupon_discounts: Money = allocated.iter().sum();

    let after_coupons = after_cart.saturating_sub(coupon_discounts);
    let loyalty_discount = input.loyalty_value.clamp_to(after_coupons);

    let total_savings = item_discounts + cart_discount + coupon_discounts + loyalty_discount;
    let taxable_base = subtotal.saturating_sub(total_savings);
    let tax = taxable_base.calculate_tax(input.tax_rate);
    let total = taxable_base + tax;

    let paid = input.paid;
    Totals {
        subtotal,
        item_discounts,
        cart_discount,
        coupon_discounts,
        coupons,
        loyalty_discount,
        total_savings,
        taxable_base,
        tax_rate: input.tax_rate,
        tax,
        total,
        paid,
        remaining: total.saturating_sub(paid),
        change: paid.saturating_sub(total),
    }
}
