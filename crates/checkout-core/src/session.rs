//! # Checkout Session
//!
//! The command and query surface of one register. Owns the active cart and
//! every ledger around it; collaborators come in through [`crate::ports`].
//!
//! ## Command Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  command (add_item, apply_coupon, ...)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate input ─── Err ──► session untouched                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  mutate ledger                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  re-validate coupons ──► detached coupons reported, not kept            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CartUpdate { totals, detached_coupons, pending_override }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payment Lock
//! Once a tender is recorded, commands that would change the total fail with
//! `PaymentInProgress` until the tenders are removed or the payment is
//! cancelled. Cancelling therefore never has anything to roll back.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::approval::{ApprovalDecision, OverrideChange, PendingOverride};
use crate::cart::{Cart, LineItem};
use crate::config::PricingConfig;
use crate::coupon::engine::{self, CouponContext};
use crate::coupon::{AppliedCoupon, Coupon};
use crate::discount::CartDiscount;
use crate::error::{CoreError, CoreResult, CouponValidationError};
use crate::held::{self, HeldCart, HeldCartSummary};
use crate::loyalty::LoyaltyAccount;
use crate::money::Money;
use crate::ports::{
    ApprovalGate, Clock, CouponCatalog, KeyValueStore, NoopSink, SystemClock, TransactionSink,
};
use crate::receipt::{PointDeltas, Transaction};
use crate::settlement::{SettlementLedger, Tender};
use crate::totals::{self, Totals, TotalsInput};
use crate::types::{Customer, DiscountValue, SettlementStatus, TenderKind};
use crate::validation::{validate_coupon_code, validate_discount_value, validate_price};

/// Result of a command that may change the total.
#[derive(Debug, Clone)]
pub struct CartUpdate {
    pub totals: Totals,
    /// Coupons removed by re-validation, with the reason.
    pub detached_coupons: Vec<CouponValidationError>,
    /// A change waiting for approval, excluded from `totals`.
    pub pending_override: Option<PendingOverride>,
}

/// Result of a successful `settle`.
#[derive(Debug, Clone)]
pub struct CompletedSale {
    pub transaction: Transaction,
    /// The attached customer with points and store credit updated.
    pub customer: Option<Customer>,
}

/// One register's active sale.
pub struct CheckoutSession {
    config: PricingConfig,
    cart: Cart,
    cart_discount: Option<CartDiscount>,
    coupons: Vec<AppliedCoupon>,
    customer: Option<Customer>,
    loyalty: LoyaltyAccount,
    pending: Option<PendingOverride>,
    ledger: SettlementLedger,
    catalog: Box<dyn CouponCatalog>,
    clock: Box<dyn Clock>,
    sink: Box<dyn TransactionSink>,
}

impl CheckoutSession {
    /// Creates a session with an empty cart, the system clock and no sink.
    pub fn new(config: PricingConfig, catalog: impl CouponCatalog + 'static) -> Self {
        CheckoutSession {
            config,
            cart: Cart::new(),
            cart_discount: None,
            coupons: Vec::new(),
            customer: None,
            loyalty: LoyaltyAccount::default(),
            pending: None,
            ledger: SettlementLedger::new(),
            catalog: Box::new(catalog),
            clock: Box::new(SystemClock),
            sink: Box::new(NoopSink),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_sink(mut self, sink: impl TransactionSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The current totals. Reading twice without a command in between gives
    /// identical results.
    pub fn totals(&self) -> Totals {
        totals::compute(TotalsInput {
            cart: &self.cart,
            cart_discount: self.cart_discount.as_ref(),
            coupons: &self.coupons,
            loyalty_value: self.loyalty_value(),
            tax_rate: self.config.tax_rate,
            paid: self.ledger.paid(),
        })
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_discount(&self) -> Option<&CartDiscount> {
        self.cart_discount.as_ref()
    }

    pub fn applied_coupons(&self) -> &[AppliedCoupon] {
        &self.coupons
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn loyalty(&self) -> LoyaltyAccount {
        self.loyalty
    }

    pub fn tenders(&self) -> &[Tender] {
        self.ledger.tenders()
    }

    pub fn settlement_status(&self) -> SettlementStatus {
        self.ledger.status()
    }

    pub fn pending_override(&self) -> Option<&PendingOverride> {
        self.pending.as_ref()
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn catalog(&self) -> &dyn CouponCatalog {
        self.catalog.as_ref()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn loyalty_value(&self) -> Money {
        if self.customer.is_none() || !self.config.loyalty.enabled {
            return Money::zero();
        }
        self.config
            .loyalty
            .redemption_value(self.loyalty.points_to_redeem)
    }

    fn ensure_cart_unlocked(&self) -> CoreResult<()> {
        if self.ledger.has_tenders() {
            return Err(CoreError::PaymentInProgress);
        }
        Ok(())
    }

    fn ensure_no_pending(&self) -> CoreResult<()> {
        match &self.pending {
            Some(pending) => Err(CoreError::OverridePending(pending.id.to_string())),
            None => Ok(()),
        }
    }

    /// Re-validates coupons and reports the new totals.
    fn refresh(&mut self) -> CartUpdate {
        let (kept, detached) = engine::revalidate(
            self.catalog.as_ref(),
            &self.coupons,
            &self.cart,
            self.cart_discount.is_some(),
            self.clock.now(),
        );
        self.coupons = kept;
        CartUpdate {
            totals: self.totals(),
            detached_coupons: detached,
            pending_override: self.pending.clone(),
        }
    }

    fn reset(&mut self) {
        self.cart.clear();
        self.cart_discount = None;
        self.coupons.clear();
        self.customer = None;
        self.loyalty = LoyaltyAccount::default();
        self.pending = None;
        self.ledger = SettlementLedger::new();
    }

    // =========================================================================
    // Cart Commands
    // =========================================================================

    pub fn add_item(&mut self, item: LineItem) -> CoreResult<CartUpdate> {
        debug!(id = %item.id, quantity = item.quantity, "add_item");
        self.ensure_cart_unlocked()?;
        self.cart.add_item(item)?;
        Ok(self.refresh())
    }

    pub fn remove_item(&mut self, id: &str) -> CoreResult<CartUpdate> {
        debug!(id = %id, "remove_item");
        self.ensure_cart_unlocked()?;
        self.cart.remove_item(id)?;
        self.drop_price_override_for(id);
        Ok(self.refresh())
    }

    /// Sets a line's quantity; zero or less removes the line.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) -> CoreResult<CartUpdate> {
        debug!(id = %id, quantity, "update_quantity");
        self.ensure_cart_unlocked()?;
        self.cart.update_quantity(id, quantity)?;
        if quantity <= 0 {
            self.drop_price_override_for(id);
        }
        Ok(self.refresh())
    }

    /// A pending price change dies with its line.
    fn drop_price_override_for(&mut self, id: &str) {
        let targets_line = matches!(
            &self.pending,
            Some(PendingOverride {
                change: OverrideChange::PriceChange { item_id, .. },
                ..
            }) if item_id == id
        );
        if targets_line {
            if let Some(pending) = self.pending.take() {
                warn!(override_id = %pending.id, item = %id, "Pending price override dropped with its line");
            }
        }
    }

    pub fn apply_item_discount(&mut self, id: &str, value: DiscountValue) -> CoreResult<CartUpdate> {
        debug!(id = %id, ?value, "apply_item_discount");
        self.ensure_cart_unlocked()?;
        self.cart.apply_item_discount(id, value)?;
        Ok(self.refresh())
    }

    pub fn remove_item_discount(&mut self, id: &str) -> CoreResult<CartUpdate> {
        debug!(id = %id, "remove_item_discount");
        self.ensure_cart_unlocked()?;
        self.cart.remove_item_discount(id)?;
        Ok(self.refresh())
    }

    /// Requests a new unit price for a line. Always needs approval.
    pub fn override_price(&mut self, id: &str, price: Money) -> CoreResult<CartUpdate> {
        debug!(id = %id, price = %price, "override_price");
        self.ensure_cart_unlocked()?;
        self.ensure_no_pending()?;
        validate_price(price)?;
        let from = self
            .cart
            .get(id)
            .map(|item| item.unit_price)
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()))?;

        let pending = PendingOverride::new(
            OverrideChange::PriceChange {
                item_id: id.to_string(),
                from,
                to: price,
            },
            self.now(),
        );
        info!(override_id = %pending.id, item = %id, from = %from, to = %price, "Price override pending approval");
        self.pending = Some(pending);
        Ok(self.refresh())
    }

    /// Clears the cart, its discounts and coupons. The customer stays.
    pub fn clear_cart(&mut self) -> CoreResult<CartUpdate> {
        debug!("clear_cart");
        self.ensure_cart_unlocked()?;
        self.cart.clear();
        self.cart_discount = None;
        self.coupons.clear();
        self.pending = None;
        self.loyalty.points_to_redeem = 0;
        Ok(self.refresh())
    }

    // =========================================================================
    // Discount Commands
    // =========================================================================

    /// Sets the cart discount, replacing any previous one.
    ///
    /// When the override policy asks for approval the discount is parked as
    /// a pending override and the current cart discount stays in effect.
    pub fn apply_cart_discount(
        &mut self,
        value: DiscountValue,
        reason: Option<String>,
        requires_override: bool,
    ) -> CoreResult<CartUpdate> {
        debug!(?value, requires_override, "apply_cart_discount");
        self.ensure_cart_unlocked()?;
        validate_discount_value(&value)?;

        let discount = CartDiscount {
            value,
            reason,
            requires_override,
            applied_at: self.now(),
        };

        if self.config.overrides.requires_override(&discount) {
            self.ensure_no_pending()?;
            let pending =
                PendingOverride::new(OverrideChange::CartDiscount { discount }, self.now());
            info!(override_id = %pending.id, "Cart discount pending approval");
            self.pending = Some(pending);
        } else {
            info!(?value, "Cart discount applied");
            self.cart_discount = Some(discount);
        }

        Ok(self.refresh())
    }

    pub fn remove_cart_discount(&mut self) -> CoreResult<CartUpdate> {
        debug!("remove_cart_discount");
        self.ensure_cart_unlocked()?;
        self.cart_discount = None;
        Ok(self.refresh())
    }

    // =========================================================================
    // Coupon Commands
    // =========================================================================

    pub fn apply_coupon(&mut self, code: &str) -> CoreResult<CartUpdate> {
        debug!(code = %code, "apply_coupon");
        self.ensure_cart_unlocked()?;
        validate_coupon_code(code)?;

        let ctx = CouponContext {
            cart: &self.cart,
            applied: &self.coupons,
            cart_discount_active: self.cart_discount.is_some(),
            now: self.now(),
        };
        let coupon = engine::validate(self.catalog.as_ref(), code, &ctx)?;

        info!(code = %coupon.code, kind = %coupon.kind.tag(), "Coupon applied");
        self.coupons.push(AppliedCoupon {
            coupon,
            discount_amount: Money::zero(),
            applied_at: self.now(),
        });
        Ok(self.refresh())
    }

    pub fn remove_coupon(&mut self, code: &str) -> CoreResult<CartUpdate> {
        debug!(code = %code, "remove_coupon");
        self.ensure_cart_unlocked()?;
        let code = Coupon::normalize_code(code);
        let index = self
            .coupons
            .iter()
            .position(|c| c.code() == code)
            .ok_or_else(|| CoreError::CouponNotApplied(code.clone()))?;
        self.coupons.remove(index);
        info!(code = %code, "Coupon removed");
        Ok(self.refresh())
    }

    // =========================================================================
    // Customer & Loyalty Commands
    // =========================================================================

    /// Attaches a customer looked up by the caller. Replaces any earlier one.
    pub fn attach_customer(&mut self, customer: Customer) -> CoreResult<CartUpdate> {
        debug!(customer = %customer.id, "attach_customer");
        self.ensure_cart_unlocked()?;
        self.loyalty = LoyaltyAccount::new(customer.loyalty_points);
        self.customer = Some(customer);
        Ok(self.refresh())
    }

    pub fn detach_customer(&mut self) -> CoreResult<CartUpdate> {
        debug!("detach_customer");
        self.ensure_cart_unlocked()?;
        self.customer = None;
        self.loyalty = LoyaltyAccount::default();
        Ok(self.refresh())
    }

    /// Redeems `points` on this sale; `0` cancels redemption.
    pub fn redeem_loyalty_points(&mut self, points: u64) -> CoreResult<CartUpdate> {
        debug!(points, "redeem_loyalty_points");
        self.ensure_cart_unlocked()?;
        if self.customer.is_none() {
            return Err(CoreError::NoCustomer);
        }
        if !self.config.loyalty.enabled {
            return Err(CoreError::InvalidAmount {
                field: "loyalty points".to_string(),
                reason: "loyalty is disabled".to_string(),
            });
        }
        self.loyalty.redeem(points)?;
        Ok(self.refresh())
    }

    // =========================================================================
    // Payment Commands
    // =========================================================================

    /// Records a tender.
    ///
    /// ## Rules
    /// - The cart must not be empty
    /// - Nothing may be tendered once the total is covered
    /// - Only cash may exceed the remaining balance (it produces change)
    /// - Store credit is capped at the remaining balance and at the
    ///   customer's available credit
    pub fn add_tender(&mut self, kind: TenderKind, amount: Money) -> CoreResult<Totals> {
        debug!(%kind, amount = %amount, "add_tender");
        if self.cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let remaining = self.totals().remaining;
        if remaining.is_zero() && amount.is_positive() {
            return Err(CoreError::InvalidAmount {
                field: "tender amount".to_string(),
                reason: "balance is already covered".to_string(),
            });
        }

        let now = self.now();
        match kind {
            TenderKind::Cash => {
                self.ledger.add_tender(kind, amount, now)?;
            }
            TenderKind::StoreCredit => {
                let available = self
                    .customer
                    .as_ref()
                    .map(|c| c.store_credit)
                    .ok_or(CoreError::NoCustomer)?;
                let capped = if amount.is_positive() {
                    amount.min(remaining)
                } else {
                    amount
                };
                self.ledger.add_store_credit(capped, available, now)?;
            }
            _ => {
                if amount > remaining {
                    return Err(CoreError::InvalidAmount {
                        field: "tender amount".to_string(),
                        reason: format!("{} exceeds remaining balance {}", amount, remaining),
                    });
                }
                self.ledger.add_tender(kind, amount, now)?;
            }
        }

        Ok(self.totals())
    }

    pub fn remove_tender(&mut self, id: Uuid) -> CoreResult<Totals> {
        debug!(%id, "remove_tender");
        self.ledger.remove_tender(id)?;
        Ok(self.totals())
    }

    /// Completes the sale.
    ///
    /// On success the transaction is handed to the sink, coupon redemptions
    /// are recorded in the catalog and the session starts a new sale. On
    /// `InsufficientPayment` nothing changes.
    pub fn settle(&mut self) -> CoreResult<CompletedSale> {
        debug!("settle");
        if self.cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let totals = self.totals();
        let change = self.ledger.settle(totals.total)?;

        if let Some(pending) = self.pending.take() {
            warn!(override_id = %pending.id, "Unapproved override dropped at settlement");
        }

        let points = match &self.customer {
            Some(_) => PointDeltas {
                used: self
                    .config
                    .loyalty
                    .points_for(totals.loyalty_discount)
                    .min(self.loyalty.points_to_redeem),
                earned: self.config.loyalty.points_earned(totals.total),
            },
            None => PointDeltas::default(),
        };

        for applied in &self.coupons {
            self.catalog.record_redemption(applied.code());
        }

        let customer = self.customer.take().map(|mut customer| {
            customer.loyalty_points = self.loyalty.balance_after(points.used, points.earned);
            customer.store_credit = customer
                .store_credit
                .saturating_sub(self.ledger.paid_with(TenderKind::StoreCredit));
            customer
        });

        let transaction = Transaction::build(
            self.now(),
            customer.as_ref().map(|c| c.id.clone()),
            self.cart.items(),
            totals,
            self.ledger.tenders().to_vec(),
            points,
        );

        info!(
            receipt = %transaction.receipt_number,
            total = %transaction.total,
            change = %change,
            points_earned = points.earned,
            "Sale settled"
        );
        self.sink.hand_off(transaction.clone());
        self.reset();

        Ok(CompletedSale {
            transaction,
            customer,
        })
    }

    /// Abandons the payment. Tenders are discarded; the cart, discounts and
    /// coupons stay as they were before the first tender.
    pub fn cancel(&mut self) -> CoreResult<Totals> {
        debug!("cancel");
        let discarded = self.ledger.cancel()?;
        info!(tenders = discarded.len(), "Payment cancelled");
        self.ledger = SettlementLedger::new();
        Ok(self.totals())
    }

    // =========================================================================
    // Override Commands
    // =========================================================================

    /// Asks `gate` about the pending change and applies its decision.
    pub fn review_override(&mut self, gate: &dyn ApprovalGate) -> CoreResult<CartUpdate> {
        let pending = self.pending.as_ref().ok_or(CoreError::NoPendingOverride)?;
        let decision = gate.review(pending);
        self.resolve_override(decision)
    }

    /// Applies an approval decision to the pending change.
    pub fn resolve_override(&mut self, decision: ApprovalDecision) -> CoreResult<CartUpdate> {
        debug!(?decision, "resolve_override");
        let pending = self.pending.clone().ok_or(CoreError::NoPendingOverride)?;

        match decision {
            ApprovalDecision::Approved { approver } => {
                self.ensure_cart_unlocked()?;
                match pending.change {
                    OverrideChange::CartDiscount { discount } => {
                        self.cart_discount = Some(discount);
                    }
                    OverrideChange::PriceChange { item_id, to, .. } => {
                        self.cart.set_unit_price(&item_id, to)?;
                    }
                }
                info!(override_id = %pending.id, approver = %approver, "Override approved");
            }
            ApprovalDecision::Rejected { reason } => {
                warn!(override_id = %pending.id, reason = %reason, "Override rejected");
            }
        }

        self.pending = None;
        Ok(self.refresh())
    }

    // =========================================================================
    // Held Carts
    // =========================================================================

    /// Parks the active sale in `store` and starts a new one.
    pub fn hold(
        &mut self,
        store: &mut dyn KeyValueStore,
        label: Option<String>,
    ) -> CoreResult<HeldCartSummary> {
        debug!(?label, "hold");
        if self.cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        self.ensure_cart_unlocked()?;

        let snapshot = HeldCart {
            id: Uuid::new_v4(),
            label,
            held_at: self.now(),
            items: self.cart.items().to_vec(),
            cart_discount: self.cart_discount.clone(),
            coupon_codes: self.coupons.iter().map(|c| c.code().to_string()).collect(),
            customer: self.customer.clone(),
            points_to_redeem: self.loyalty.points_to_redeem,
        };
        held::save(store, &snapshot)?;

        if let Some(pending) = &self.pending {
            warn!(override_id = %pending.id, "Unapproved override dropped when holding cart");
        }
        info!(held_id = %snapshot.id, items = snapshot.items.len(), "Cart held");
        self.reset();
        Ok(snapshot.summary())
    }

    /// Restores a held sale into this (empty) session and removes it from
    /// `store`. Coupons that no longer validate are reported as detached.
    pub fn recall(&mut self, store: &mut dyn KeyValueStore, id: Uuid) -> CoreResult<CartUpdate> {
        debug!(%id, "recall");
        if !self.cart.is_empty() {
            return Err(CoreError::CartNotEmpty);
        }
        self.ensure_cart_unlocked()?;

        let snapshot = held::load(store, id)?;
        let cart = Cart::from_items(snapshot.items)?;

        let mut loyalty = snapshot
            .customer
            .as_ref()
            .map(|c| LoyaltyAccount::new(c.loyalty_points))
            .unwrap_or_default();
        if loyalty.redeem(snapshot.points_to_redeem).is_err() {
            warn!(points = snapshot.points_to_redeem, "Held loyalty redemption no longer covered");
        }

        let now = self.now();
        let mut coupons: Vec<AppliedCoupon> = Vec::new();
        let mut detached = Vec::new();
        for code in &snapshot.coupon_codes {
            let ctx = CouponContext {
                cart: &cart,
                applied: &coupons,
                cart_discount_active: snapshot.cart_discount.is_some(),
                now,
            };
            match engine::validate(self.catalog.as_ref(), code, &ctx) {
                Ok(coupon) => coupons.push(AppliedCoupon {
                    coupon,
                    discount_amount: Money::zero(),
                    applied_at: now,
                }),
                Err(reason) => {
                    warn!(code = %code, %reason, "Held coupon no longer valid");
                    detached.push(reason);
                }
            }
        }

        held::discard(store, id)?;

        self.cart = cart;
        self.cart_discount = snapshot.cart_discount;
        self.coupons = coupons;
        self.customer = snapshot.customer;
        self.loyalty = loyalty;
        self.pending = None;
        info!(held_id = %id, items = self.cart.item_count(), "Held cart recalled");

        let mut update = self.refresh();
        detached.append(&mut update.detached_coupons);
        update.detached_coupons = detached;
        Ok(update)
    }
}

impl std::fmt::Debug for CheckoutSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutSession")
            .field("cart", &self.cart)
            .field("cart_discount", &self.cart_discount)
            .field("coupons", &self.coupons)
            .field("customer", &self.customer)
            .field("loyalty", &self.loyalty)
            .field("pending", &self.pending)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}
