//! # Coupon Catalog State
//!
//! The in-memory catalog the session validates against, shared with the
//! catalog commands. Every change is mirrored to SQLite through the
//! hand-off worker.
//!
//! ```text
//! CatalogState ─── Arc<Mutex<InMemoryCouponCatalog>> ───┐
//!   create / update / delete / reset                    │ same catalog
//!                                                       │
//! PersistentCatalog (inside CheckoutSession) ───────────┘
//!   find(code)               read
//!   record_redemption(code)  increment + Handoff::CouponRedeemed
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::info;

use checkout_core::coupon::{Coupon, InMemoryCouponCatalog};
use checkout_core::ports::CouponCatalog;
use checkout_core::CoreResult;

use crate::handoff::{Handoff, HandoffHandle};

fn lock(catalog: &Mutex<InMemoryCouponCatalog>) -> MutexGuard<'_, InMemoryCouponCatalog> {
    match catalog.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// =============================================================================
// Catalog State
// =============================================================================

/// Catalog management for the catalog commands.
#[derive(Debug, Clone)]
pub struct CatalogState {
    catalog: Arc<Mutex<InMemoryCouponCatalog>>,
    handoff: HandoffHandle,
}

impl CatalogState {
    pub fn new(catalog: InMemoryCouponCatalog, handoff: HandoffHandle) -> Self {
        CatalogState {
            catalog: Arc::new(Mutex::new(catalog)),
            handoff,
        }
    }

    /// The port handed to the session. Reads see every catalog change.
    pub fn port(&self) -> PersistentCatalog {
        PersistentCatalog {
            catalog: Arc::clone(&self.catalog),
            handoff: self.handoff.clone(),
        }
    }

    pub fn list(&self) -> Vec<Coupon> {
        lock(&self.catalog).list()
    }

    pub fn get(&self, code: &str) -> Option<Coupon> {
        lock(&self.catalog).find(code)
    }

    pub fn create(&self, coupon: Coupon) -> CoreResult<Coupon> {
        let created = lock(&self.catalog).create(coupon)?;
        self.handoff.send(Handoff::CouponCreated(created.clone()));
        Ok(created)
    }

    pub fn update(&self, coupon: Coupon) -> CoreResult<Coupon> {
        let updated = lock(&self.catalog).update(coupon)?;
        self.handoff.send(Handoff::CouponUpdated(updated.clone()));
        Ok(updated)
    }

    pub fn delete(&self, code: &str) -> CoreResult<Coupon> {
        let deleted = lock(&self.catalog).delete(code)?;
        self.handoff.send(Handoff::CouponDeleted(deleted.code.clone()));
        Ok(deleted)
    }

    /// Swaps in a catalog loaded from the database. Nothing is mirrored.
    pub fn replace(&self, catalog: InMemoryCouponCatalog) -> Vec<Coupon> {
        let mut current = lock(&self.catalog);
        *current = catalog;
        info!(count = current.len(), "Coupon catalog reloaded");
        current.list()
    }

    /// Restores the default coupon set, valid from now.
    pub fn reset_to_defaults(&self) -> Vec<Coupon> {
        let now = Utc::now();
        let mut catalog = lock(&self.catalog);
        catalog.reset_to_defaults(now);
        self.handoff.send(Handoff::CatalogReset(now));
        info!(count = catalog.len(), "Coupon catalog reset");
        catalog.list()
    }
}

// =============================================================================
// Session Port
// =============================================================================

/// [`CouponCatalog`] port given to the session.
#[derive(Debug, Clone)]
pub struct PersistentCatalog {
    catalog: Arc<Mutex<InMemoryCouponCatalog>>,
    handoff: HandoffHandle,
}

impl CouponCatalog for PersistentCatalog {
    fn find(&self, code: &str) -> Option<Coupon> {
        lock(&self.catalog).find(code)
    }

    fn record_redemption(&mut self, code: &str) {
        lock(&self.catalog).record_redemption(code);
        self.handoff
            .send(Handoff::CouponRedeemed(Coupon::normalize_code(code)));
    }
}
