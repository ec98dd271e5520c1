//! # Override Gate
//!
//! Changes that need a manager (large cart discounts, price overrides) are
//! parked here until a decision arrives.
//!
//! ```text
//!   apply_cart_discount(50%)         override_price(item, $1.00)
//!            │                                 │
//!            ▼                                 ▼
//!   policy says gated? ──── no ──► applied immediately
//!            │ yes
//!            ▼
//!   PendingOverride ──► excluded from totals
//!            │
//!            ├── Approved ──► change applied, totals recomputed
//!            └── Rejected ──► change discarded
//! ```
//!
//! Only the gate is modelled. Who approves, and how they prove it, is up to
//! the [`ApprovalGate`](crate::ports::ApprovalGate) implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::discount::CartDiscount;
use crate::money::Money;
use crate::types::DiscountValue;

/// A change waiting for approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOverride {
    pub id: Uuid,
    pub change: OverrideChange,
    pub requested_at: DateTime<Utc>,
}

impl PendingOverride {
    pub fn new(change: OverrideChange, requested_at: DateTime<Utc>) -> Self {
        PendingOverride {
            id: Uuid::new_v4(),
            change,
            requested_at,
        }
    }
}

/// The change an override would make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OverrideChange {
    CartDiscount { discount: CartDiscount },
    PriceChange {
        item_id: String,
        from: Money,
        to: Money,
    },
}

/// A manager's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved { approver: String },
    Rejected { reason: String },
}

/// Which cart discounts need approval.
///
/// With both limits unset, a cart discount only needs approval when the
/// caller marks it `requires_override`. Price overrides always need it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverridePolicy {
    /// Largest percentage (bps) allowed without approval.
    #[serde(default)]
    pub max_percentage_without_override: Option<u32>,
    /// Largest fixed amount (cents) allowed without approval.
    #[serde(default)]
    pub max_fixed_without_override: Option<Money>,
}

impl OverridePolicy {
    /// Whether `discount` has to go through the gate.
    pub fn requires_override(&self, discount: &CartDiscount) -> bool {
        if discount.requires_override {
            return true;
        }
        match discount.value {
            DiscountValue::Percentage { value } => self
                .max_percentage_without_override
                .is_some_and(|max| value.bps() > max),
            DiscountValue::Fixed { value } => self
                .max_fixed_without_override
                .is_some_and(|max| value > max),
        }
    }
}
