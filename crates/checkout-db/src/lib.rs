//! # checkout-db: Database Layer for the Register
//!
//! SQLite storage for the two things the register keeps between runs: the
//! coupon catalog and key-value entries (held carts). Uses sqlx for async
//! access and embedded migrations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Register Data Flow                               │
//! │                                                                         │
//! │  register startup ── load catalog, load held carts                     │
//! │  hand-off worker  ── coupon write-back, held cart write-back           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  checkout-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ CouponRepo     │   │ 001_coupons  │  │   │
//! │  │   │ SqlitePool    │◄───│ KeyValueRepo   │   │ 002_key_value│  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/checkout.db                                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Coupon and key-value repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("checkout.db")).await?;
//! if db.coupons().count().await? == 0 {
//!     db.coupons().reset_to_defaults(chrono::Utc::now()).await?;
//! }
//! let catalog = db.coupons().load_catalog().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::coupon::CouponRepository;
pub use repository::kv::KeyValueRepository;
