//! # Coupon Catalog Commands
//!
//! Manage the coupon definitions the session validates against. Changes
//! take effect for the next `apply_coupon`; coupons already applied to the
//! active sale are re-checked on the next cart change.

use tracing::debug;

use checkout_core::coupon::Coupon;

use crate::error::ApiError;
use crate::state::AppState;

pub fn list_coupons(app: &AppState) -> Vec<Coupon> {
    app.catalog.list()
}

/// The code is stored upper-cased.
pub fn create_coupon(app: &AppState, coupon: Coupon) -> Result<Coupon, ApiError> {
    debug!(code = %coupon.code, "create_coupon");
    Ok(app.catalog.create(coupon)?)
}

pub fn update_coupon(app: &AppState, coupon: Coupon) -> Result<Coupon, ApiError> {
    debug!(code = %coupon.code, "update_coupon");
    Ok(app.catalog.update(coupon)?)
}

/// Returns the deleted definition.
pub fn delete_coupon(app: &AppState, code: &str) -> Result<Coupon, ApiError> {
    debug!(code = %code, "delete_coupon");
    Ok(app.catalog.delete(code)?)
}

/// Restores the default coupon set.
pub fn reset_coupons(app: &AppState) -> Vec<Coupon> {
    app.catalog.reset_to_defaults()
}

/// Re-reads the catalog from the database, dropping in-memory changes
/// that have not been written yet.
pub async fn reload_coupons(app: &AppState) -> Result<Vec<Coupon>, ApiError> {
    let catalog = app.db.coupons().load_catalog().await?;
    Ok(app.catalog.replace(catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart;
    use crate::commands::test_support::app;
    use crate::error::ErrorCode;
    use crate::handoff::HandoffWorker;
    use checkout_core::cart::LineItem;
    use checkout_core::coupon::CouponKind;
    use checkout_core::Money;

    #[tokio::test]
    async fn test_created_coupon_applies_to_sale() {
        let (app, _rx) = app(false).await;
        let mut coupon = app.catalog.get("WELCOME5").unwrap();
        coupon.code = "take3".to_string();
        coupon.minimum_purchase = None;
        coupon.kind = CouponKind::Fixed {
            amount: Money::from_cents(300),
        };

        let created = create_coupon(&app, coupon).unwrap();
        assert_eq!(created.code, "TAKE3");

        cart::add_item(
            &app,
            LineItem::new("a", "A", Money::from_cents(1000), 1, "general"),
        )
        .unwrap();
        let update = cart::apply_coupon(&app, "TAKE3").unwrap();
        assert_eq!(update.totals.coupon_discounts, Money::from_cents(300));
    }

    #[tokio::test]
    async fn test_delete_unknown_coupon() {
        let (app, _rx) = app(false).await;
        let err = delete_coupon(&app, "NOPE").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(list_coupons(&app).len(), reset_coupons(&app).len());
    }

    #[tokio::test]
    async fn test_reload_reads_what_the_worker_wrote() {
        let (app, rx) = app(false).await;
        let worker = tokio::spawn(HandoffWorker::new(app.db.clone(), rx).run());

        let defaults = reset_coupons(&app);
        delete_coupon(&app, "BOGO").unwrap();

        // Wait for the worker to drain what is queued so far.
        while app.db.coupons().get("BOGO").await.unwrap().is_some()
            || app.db.coupons().count().await.unwrap() == 0
        {
            tokio::task::yield_now().await;
        }

        let reloaded = reload_coupons(&app).await.unwrap();
        assert_eq!(reloaded.len(), defaults.len() - 1);
        assert!(app.catalog.get("BOGO").is_none());

        drop(app);
        worker.await.unwrap();
    }
}
