//! # Cart Commands
//!
//! Cart lines, discounts, coupons, customer and the override gate.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│  Tender  │────►│ Settled  │       │
//! │  │  Cart    │     │          │     │  (locked)│     │          │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │   ▲             │                              │
//! │              add_item  │   │  cancel_payment / remove_tender           │
//! │              apply_coupon  └─────────────┘                              │
//! │              apply_cart_discount                                        │
//! │                        │                                                │
//! │                        ▼                                                │
//! │        pending override ── approve_override / reject_override          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating command answers with an [`UpdateResponse`]: fresh totals,
//! the coupons that stopped qualifying, and any change waiting for approval.

use serde::Serialize;
use tracing::info;

use checkout_core::approval::{ApprovalDecision, PendingOverride};
use checkout_core::cart::LineItem;
use checkout_core::discount::CartDiscount;
use checkout_core::ports::StaticApprovalGate;
use checkout_core::settlement::Tender;
use checkout_core::{
    CartUpdate, CheckoutSession, CoreResult, Customer, DiscountValue, Money, Totals,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Approver recorded when `auto_approve_overrides` is on.
pub const AUTO_APPROVER: &str = "auto";

// =============================================================================
// Responses
// =============================================================================

/// Full view of the active sale.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<LineItem>,
    pub cart_discount: Option<CartDiscount>,
    pub coupons: Vec<String>,
    pub customer: Option<Customer>,
    pub points_to_redeem: u64,
    pub tenders: Vec<Tender>,
    pub pending_override: Option<PendingOverride>,
    pub totals: Totals,
}

impl From<&CheckoutSession> for CartResponse {
    fn from(session: &CheckoutSession) -> Self {
        CartResponse {
            items: session.cart().items().to_vec(),
            cart_discount: session.cart_discount().cloned(),
            coupons: session
                .applied_coupons()
                .iter()
                .map(|c| c.code().to_string())
                .collect(),
            customer: session.customer().cloned(),
            points_to_redeem: session.loyalty().points_to_redeem,
            tenders: session.tenders().to_vec(),
            pending_override: session.pending_override().cloned(),
            totals: session.totals(),
        }
    }
}

/// A coupon removed because the cart no longer qualifies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachedCoupon {
    pub code: String,
    pub reason: String,
}

/// Answer to a cart-changing command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub totals: Totals,
    pub detached_coupons: Vec<DetachedCoupon>,
    pub pending_override: Option<PendingOverride>,
}

impl From<CartUpdate> for UpdateResponse {
    fn from(update: CartUpdate) -> Self {
        UpdateResponse {
            totals: update.totals,
            detached_coupons: update
                .detached_coupons
                .iter()
                .map(|e| DetachedCoupon {
                    code: e.code().to_string(),
                    reason: e.to_string(),
                })
                .collect(),
            pending_override: update.pending_override,
        }
    }
}

/// Runs a cart command and, with `auto_approve_overrides`, approves the
/// override it parked in the same step.
pub(crate) fn update_with<F>(app: &AppState, f: F) -> Result<UpdateResponse, ApiError>
where
    F: FnOnce(&mut CheckoutSession) -> CoreResult<CartUpdate>,
{
    let auto_approve = app.config.auto_approve_overrides;
    app.session.with_session_mut(|session| {
        let mut update = f(session)?;

        if auto_approve && update.pending_override.is_some() {
            let gate = StaticApprovalGate(ApprovalDecision::Approved {
                approver: AUTO_APPROVER.to_string(),
            });
            let mut detached = std::mem::take(&mut update.detached_coupons);
            update = session.review_override(&gate)?;
            detached.append(&mut update.detached_coupons);
            update.detached_coupons = detached;
        }

        Ok(UpdateResponse::from(update))
    })
}

// =============================================================================
// Queries
// =============================================================================

pub fn get_cart(app: &AppState) -> CartResponse {
    app.session.with_session(|s| CartResponse::from(s))
}

pub fn get_totals(app: &AppState) -> Totals {
    app.session.with_session(|s| s.totals())
}

// =============================================================================
// Cart Lines
// =============================================================================

pub fn add_item(app: &AppState, item: LineItem) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.add_item(item))
}

pub fn remove_item(app: &AppState, id: &str) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.remove_item(id))
}

pub fn update_quantity(app: &AppState, id: &str, quantity: i64) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.update_quantity(id, quantity))
}

pub fn apply_item_discount(
    app: &AppState,
    id: &str,
    discount: DiscountValue,
) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.apply_item_discount(id, discount))
}

pub fn remove_item_discount(app: &AppState, id: &str) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.remove_item_discount(id))
}

/// Always parks the new price for approval.
pub fn override_price(app: &AppState, id: &str, price: Money) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.override_price(id, price))
}

pub fn clear_cart(app: &AppState) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.clear_cart())
}

// =============================================================================
// Discounts & Coupons
// =============================================================================

pub fn apply_cart_discount(
    app: &AppState,
    discount: DiscountValue,
    reason: Option<String>,
    requires_override: bool,
) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.apply_cart_discount(discount, reason, requires_override))
}

pub fn remove_cart_discount(app: &AppState) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.remove_cart_discount())
}

pub fn apply_coupon(app: &AppState, code: &str) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.apply_coupon(code))
}

pub fn remove_coupon(app: &AppState, code: &str) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.remove_coupon(code))
}

// =============================================================================
// Customer & Loyalty
// =============================================================================

pub fn attach_customer(app: &AppState, customer: Customer) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.attach_customer(customer))
}

pub fn detach_customer(app: &AppState) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.detach_customer())
}

pub fn redeem_points(app: &AppState, points: u64) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.redeem_loyalty_points(points))
}

// =============================================================================
// Override Gate
// =============================================================================

pub fn approve_override(app: &AppState, approver: String) -> Result<UpdateResponse, ApiError> {
    info!(approver = %approver, "Override approval received");
    update_with(app, |s| {
        s.resolve_override(ApprovalDecision::Approved { approver })
    })
}

pub fn reject_override(app: &AppState, reason: String) -> Result<UpdateResponse, ApiError> {
    update_with(app, |s| s.resolve_override(ApprovalDecision::Rejected { reason }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::app;
    use crate::error::ErrorCode;

    fn jacket() -> LineItem {
        LineItem::new("jacket", "Jacket", Money::from_cents(10000), 1, "apparel")
    }

    #[tokio::test]
    async fn test_reference_totals_through_commands() {
        let (app, _rx) = app(false).await;

        add_item(&app, jacket()).unwrap();
        apply_cart_discount(&app, DiscountValue::fixed_cents(500), None, false).unwrap();
        let update = apply_coupon(&app, "save10").unwrap();

        assert_eq!(update.totals.total, Money::from_cents(9180));
        let cart = get_cart(&app);
        assert_eq!(cart.coupons, vec!["SAVE10".to_string()]);
        assert_eq!(cart.items.len(), 1);
    }

    #[tokio::test]
    async fn test_price_override_waits_for_approval() {
        let (app, _rx) = app(false).await;
        add_item(&app, jacket()).unwrap();

        let update = override_price(&app, "jacket", Money::from_cents(8000)).unwrap();
        assert!(update.pending_override.is_some());
        assert_eq!(update.totals.subtotal, Money::from_cents(10000));

        let err = override_price(&app, "jacket", Money::from_cents(7000)).unwrap_err();
        assert_eq!(err.code, ErrorCode::OverrideError);

        let update = approve_override(&app, "manager-1".to_string()).unwrap();
        assert!(update.pending_override.is_none());
        assert_eq!(update.totals.subtotal, Money::from_cents(8000));
    }

    #[tokio::test]
    async fn test_auto_approve_applies_immediately() {
        let (app, _rx) = app(true).await;
        add_item(&app, jacket()).unwrap();

        let update = override_price(&app, "jacket", Money::from_cents(8000)).unwrap();
        assert!(update.pending_override.is_none());
        assert_eq!(update.totals.subtotal, Money::from_cents(8000));
    }

    #[tokio::test]
    async fn test_detached_coupon_is_reported() {
        let (app, _rx) = app(false).await;
        add_item(&app, LineItem::new("a", "A", Money::from_cents(2000), 1, "general")).unwrap();
        add_item(&app, LineItem::new("b", "B", Money::from_cents(1000), 1, "general")).unwrap();
        apply_coupon(&app, "WELCOME5").unwrap();

        let update = remove_item(&app, "b").unwrap();
        assert_eq!(update.detached_coupons.len(), 1);
        assert_eq!(update.detached_coupons[0].code, "WELCOME5");
        assert!(get_cart(&app).coupons.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_coupon_leaves_cart_unchanged() {
        let (app, _rx) = app(false).await;
        add_item(&app, LineItem::new("a", "A", Money::from_cents(1000), 1, "general")).unwrap();
        let before = get_totals(&app);

        let err = apply_coupon(&app, "WELCOME5").unwrap_err();
        assert_eq!(err.code, ErrorCode::CouponRejected);
        assert_eq!(get_totals(&app), before);
    }
}
