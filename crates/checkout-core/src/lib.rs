//! # checkout-core: Pricing, Coupons & Settlement
//!
//! This crate is the pricing engine of the register. It turns a cart, its
//! discounts, coupons, loyalty redemption and tenders into totals, and a
//! settled sale into a transaction record. There is no I/O in here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  register (JSON-lines commands)                 │   │
//! │  │    add_item, apply_coupon, add_tender, settle, hold, recall    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ checkout-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌──────────┐  ┌─────────┐  ┌────────────────┐  │   │
//! │  │   │  cart   │─►│ discount │─►│ totals  │─►│  settlement    │  │   │
//! │  │   └─────────┘  │ coupon   │  └─────────┘  │  loyalty       │  │   │
//! │  │                └──────────┘               │  receipt       │  │   │
//! │  │                                           └────────────────┘  │   │
//! │  │   session ── command surface      ports ── collaborators      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  checkout-db (Database Layer)                   │   │
//! │  │           coupon catalog, key-value store, migrations          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic, half-up rounding
//! - [`types`] - Shared value types (Percentage, TaxRate, TenderKind, ...)
//! - [`cart`] - Cart ledger
//! - [`discount`] - Discount resolver and the cart discount
//! - [`coupon`] - Coupon model, engine and in-memory catalog
//! - [`approval`] - Override gate
//! - [`totals`] - Totals aggregator
//! - [`settlement`] - Payment settlement ledger
//! - [`loyalty`] - Loyalty point ledger
//! - [`receipt`] - Transaction record
//! - [`held`] - Held cart snapshots
//! - [`ports`] - Collaborator traits
//! - [`session`] - The command and query surface
//! - [`config`] - Pricing configuration
//! - [`error`] / [`validation`] - Errors and input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use checkout_core::cart::LineItem;
//! use checkout_core::coupon::InMemoryCouponCatalog;
//! use checkout_core::config::PricingConfig;
//! use checkout_core::money::Money;
//! use checkout_core::session::CheckoutSession;
//! use checkout_core::types::{DiscountValue, TenderKind};
//!
//! let catalog = InMemoryCouponCatalog::with_defaults(chrono::Utc::now());
//! let mut session = CheckoutSession::new(PricingConfig::default(), catalog);
//!
//! session
//!     .add_item(LineItem::new("sku-1", "Jacket", Money::from_cents(10000), 1, "apparel"))
//!     .unwrap();
//! session
//!     .apply_cart_discount(DiscountValue::fixed_cents(500), None, false)
//!     .unwrap();
//! let update = session.apply_coupon("SAVE10").unwrap();
//! assert_eq!(update.totals.total.cents(), 9180); // $91.80
//!
//! session.add_tender(TenderKind::Cash, Money::from_cents(5000)).unwrap();
//! session.add_tender(TenderKind::Card, Money::from_cents(4180)).unwrap();
//! let sale = session.settle().unwrap();
//! assert!(sale.transaction.change.is_zero());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod approval;
pub mod cart;
pub mod config;
pub mod coupon;
pub mod discount;
pub mod error;
pub mod held;
pub mod loyalty;
pub mod money;
pub mod ports;
pub mod receipt;
pub mod session;
pub mod settlement;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, CouponValidationError, ValidationError};
pub use money::Money;
pub use session::{CartUpdate, CheckoutSession, CompletedSale};
pub use totals::Totals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and keeps receipts a reasonable length.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line
///
/// ## Business Reason
/// Catches typos at the register (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest accepted unit price or fixed discount, in cents ($1,000,000)
///
/// ## Business Reason
/// Keeps every line, subtotal and tender sum far inside i64:
/// `MAX_CART_ITEMS × MAX_ITEM_QUANTITY × MAX_UNIT_PRICE` is about 10^13 cents.
pub const MAX_UNIT_PRICE: i64 = 100_000_000;

/// Highest accepted single tender, in cents: the largest possible cart.
pub const MAX_TENDER_AMOUNT: i64 = MAX_UNIT_PRICE * MAX_ITEM_QUANTITY * MAX_CART_ITEMS as i64;
