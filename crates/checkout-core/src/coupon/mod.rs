//! # Coupon Engine
//!
//! ```text
//! coupon/
//! ├── model.rs    - Coupon, CouponKind, StackingRules, AppliedCoupon
//! ├── engine.rs   - validate, compute_discount, reprice, revalidate
//! └── catalog.rs  - InMemoryCouponCatalog, default_coupons
//! ```

pub mod catalog;
pub mod engine;
pub mod model;

pub use catalog::{default_coupons, InMemoryCouponCatalog};
pub use engine::CouponContext;
pub use model::{AppliedCoupon, Coupon, CouponKind, CouponKindTag, StackingRules};
