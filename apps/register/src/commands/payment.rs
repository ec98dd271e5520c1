//! # Payment Commands
//!
//! Tenders and settlement for the active sale.
//!
//! ```text
//! add_tender(cash, 5000) ──► add_tender(card, 4180) ──► settle
//!        │                                                │
//!        │  cart locked while tenders exist               ▼
//!        ▼                                  SaleResponse { transaction, customer }
//! cancel_payment ──► tenders discarded, cart editable again
//! ```

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use checkout_core::receipt::Transaction;
use checkout_core::{CompletedSale, Customer, Money, TenderKind, Totals};

use crate::error::ApiError;
use crate::state::AppState;

/// Result of a settled sale.
///
/// `customer` carries the updated loyalty points and store credit; the
/// caller owns writing them back to the customer system.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub transaction: Transaction,
    pub customer: Option<Customer>,
}

impl From<CompletedSale> for SaleResponse {
    fn from(sale: CompletedSale) -> Self {
        SaleResponse {
            transaction: sale.transaction,
            customer: sale.customer,
        }
    }
}

pub fn add_tender(app: &AppState, kind: TenderKind, amount: Money) -> Result<Totals, ApiError> {
    Ok(app.session.with_session_mut(|s| s.add_tender(kind, amount))?)
}

pub fn remove_tender(app: &AppState, id: Uuid) -> Result<Totals, ApiError> {
    Ok(app.session.with_session_mut(|s| s.remove_tender(id))?)
}

/// Completes the sale. The transaction is also queued for hand-off.
pub fn settle(app: &AppState) -> Result<SaleResponse, ApiError> {
    let sale = app.session.with_session_mut(|s| s.settle())?;
    info!(
        store = %app.config.store_name,
        receipt = %sale.transaction.receipt_number,
        "Sale completed"
    );
    Ok(SaleResponse::from(sale))
}

pub fn cancel_payment(app: &AppState) -> Result<Totals, ApiError> {
    Ok(app.session.with_session_mut(|s| s.cancel())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart;
    use crate::commands::test_support::app;
    use crate::error::ErrorCode;
    use crate::handoff::Handoff;
    use checkout_core::cart::LineItem;
    use checkout_core::{DiscountValue, SettlementStatus};

    async fn reference_sale() -> (AppState, tokio::sync::mpsc::UnboundedReceiver<Handoff>) {
        let (app, rx) = app(false).await;
        cart::add_item(
            &app,
            LineItem::new("jacket", "Jacket", Money::from_cents(10000), 1, "apparel"),
        )
        .unwrap();
        cart::apply_cart_discount(&app, DiscountValue::fixed_cents(500), None, false).unwrap();
        cart::apply_coupon(&app, "SAVE10").unwrap();
        (app, rx)
    }

    #[tokio::test]
    async fn test_split_tender_settles_and_hands_off() {
        let (app, mut rx) = reference_sale().await;

        let totals = add_tender(&app, TenderKind::Cash, Money::from_cents(5000)).unwrap();
        assert_eq!(totals.remaining, Money::from_cents(4180));
        add_tender(&app, TenderKind::Card, Money::from_cents(4180)).unwrap();

        let sale = settle(&app).unwrap();
        assert_eq!(sale.transaction.total, Money::from_cents(9180));
        assert!(sale.transaction.change.is_zero());
        assert!(cart::get_cart(&app).items.is_empty());

        let mut saw_redemption = false;
        let mut saw_transaction = false;
        while let Ok(work) = rx.try_recv() {
            match work {
                Handoff::CouponRedeemed(code) => saw_redemption = code == "SAVE10",
                Handoff::Transaction(_) => saw_transaction = true,
                _ => {}
            }
        }
        assert!(saw_redemption);
        assert!(saw_transaction);
    }

    #[tokio::test]
    async fn test_cart_is_locked_during_payment() {
        let (app, _rx) = reference_sale().await;
        add_tender(&app, TenderKind::Cash, Money::from_cents(1000)).unwrap();

        let err = cart::remove_coupon(&app, "SAVE10").unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);

        let err = settle(&app).unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);

        let totals = cancel_payment(&app).unwrap();
        assert!(totals.paid.is_zero());
        assert!(cart::remove_coupon(&app, "SAVE10").is_ok());
        assert_eq!(
            app.session.with_session(|s| s.settlement_status()),
            SettlementStatus::Open
        );
    }

    #[tokio::test]
    async fn test_unknown_tender_is_not_found() {
        let (app, _rx) = reference_sale().await;
        let err = remove_tender(&app, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
