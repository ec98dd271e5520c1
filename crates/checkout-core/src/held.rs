//! # Held Carts
//!
//! A cashier can park the active sale and pick it up later. The snapshot
//! goes into the [`KeyValueStore`] port as JSON under `held_cart:<id>`.
//!
//! ```text
//! hold("table 4") ──► HeldCart { lines, cart discount, coupon codes, customer }
//!                        │
//!                        ▼  serde_json
//!                  store.put("held_cart:<uuid>", json)
//!
//! recall(<uuid>) ──► store.remove(..) ──► session rebuilt, coupons re-validated
//! ```
//!
//! Coupons are stored by code only; recall re-validates them against the
//! catalog as it is at that moment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::LineItem;
use crate::discount::CartDiscount;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::ports::KeyValueStore;
use crate::types::Customer;

/// Key prefix of held cart entries.
pub const HELD_CART_PREFIX: &str = "held_cart:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldCart {
    pub id: Uuid,
    #[serde(default)]
    pub label: Option<String>,
    pub held_at: DateTime<Utc>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub cart_discount: Option<CartDiscount>,
    #[serde(default)]
    pub coupon_codes: Vec<String>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub points_to_redeem: u64,
}

impl HeldCart {
    pub fn key(&self) -> String {
        key_for(self.id)
    }

    pub fn summary(&self) -> HeldCartSummary {
        HeldCartSummary {
            id: self.id,
            label: self.label.clone(),
            held_at: self.held_at,
            item_count: self.items.len(),
            subtotal: self.items.iter().map(LineItem::line_total).sum(),
        }
    }
}

/// What the recall list shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldCartSummary {
    pub id: Uuid,
    pub label: Option<String>,
    pub held_at: DateTime<Utc>,
    pub item_count: usize,
    pub subtotal: Money,
}

fn key_for(id: Uuid) -> String {
    format!("{}{}", HELD_CART_PREFIX, id)
}

/// Writes a snapshot into the store.
pub fn save(store: &mut dyn KeyValueStore, held: &HeldCart) -> CoreResult<()> {
    let json =
        serde_json::to_string(held).map_err(|e| CoreError::Serialization(e.to_string()))?;
    store.put(&held.key(), json);
    Ok(())
}

/// Reads a snapshot without removing it.
pub fn load(store: &dyn KeyValueStore, id: Uuid) -> CoreResult<HeldCart> {
    let json = store
        .get(&key_for(id))
        .ok_or_else(|| CoreError::HeldCartNotFound(id.to_string()))?;
    serde_json::from_str(&json).map_err(|e| CoreError::Serialization(e.to_string()))
}

/// Deletes a snapshot.
pub fn discard(store: &mut dyn KeyValueStore, id: Uuid) -> CoreResult<()> {
    store
        .remove(&key_for(id))
        .map(|_| ())
        .ok_or_else(|| CoreError::HeldCartNotFound(id.to_string()))
}

/// All held carts, oldest first. Unreadable entries are skipped.
pub fn list(store: &dyn KeyValueStore) -> Vec<HeldCartSummary> {
    let mut held: Vec<HeldCartSummary> = store
        .keys_with_prefix(HELD_CART_PREFIX)
        .iter()
        .filter_map(|key| store.get(key))
        .filter_map(|json| serde_json::from_str::<HeldCart>(&json).ok())
        .map(|cart| cart.summary())
        .collect();
    held.sort_by_key(|summary| summary.held_at);
    held
}
