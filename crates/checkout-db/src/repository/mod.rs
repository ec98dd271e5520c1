//! # Repository Module
//!
//! Database repositories of the register.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register                                                               │
//! │       │                                                                 │
//! │       │  db.coupons().load_catalog()      db.kv().put(key, json)        │
//! │       ▼                                   ▼                             │
//! │  CouponRepository                    KeyValueRepository                 │
//! │  ├── list / get                      ├── get / put / remove            │
//! │  ├── create / update / delete        ├── keys_with_prefix              │
//! │  ├── increment_usage                 └── load_all                      │
//! │  ├── reset_to_defaults                                                 │
//! │  └── load_catalog                                                      │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  coupons table                        key_value table                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod coupon;
pub mod kv;
