//! # Collaborator Ports
//!
//! Everything the pricing core needs from the outside world comes in
//! through one of these traits. The core never reaches for globals, clocks
//! or storage on its own.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CheckoutSession                                   │
//! │                                                                         │
//! │   Clock ─────────── now()                                               │
//! │   CouponCatalog ─── find(code), record_redemption(code)                 │
//! │   ApprovalGate ──── review(pending) → Approved | Rejected               │
//! │   KeyValueStore ─── held cart snapshots                                 │
//! │   TransactionSink ─ hand_off(transaction), fire-and-forget              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Hand-offs never report back. An implementation that needs I/O (the
//! register's SQLite write-back, for example) queues the work and returns.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::approval::{ApprovalDecision, PendingOverride};
use crate::coupon::Coupon;
use crate::receipt::Transaction;

// =============================================================================
// Clock
// =============================================================================

/// Source of the current time.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// =============================================================================
// Coupon Catalog
// =============================================================================

/// Read access to coupon definitions, plus usage write-back.
pub trait CouponCatalog: Send {
    /// Current definition of `code` (case-insensitive).
    fn find(&self, code: &str) -> Option<Coupon>;

    /// Counts one use of `code` by a settled sale.
    fn record_redemption(&mut self, code: &str);
}

/// A catalog shared with the code that manages it.
impl<C: CouponCatalog> CouponCatalog for Arc<Mutex<C>> {
    fn find(&self, code: &str) -> Option<Coupon> {
        match self.lock() {
            Ok(catalog) => catalog.find(code),
            Err(poisoned) => poisoned.into_inner().find(code),
        }
    }

    fn record_redemption(&mut self, code: &str) {
        match self.lock() {
            Ok(mut catalog) => catalog.record_redemption(code),
            Err(poisoned) => poisoned.into_inner().record_redemption(code),
        }
    }
}

// =============================================================================
// Approval Gate
// =============================================================================

/// Decides on override-gated changes.
///
/// Implementations own authentication; the core only sees the decision.
pub trait ApprovalGate {
    fn review(&self, pending: &PendingOverride) -> ApprovalDecision;
}

/// Answers every request the same way.
#[derive(Debug, Clone)]
pub struct StaticApprovalGate(pub ApprovalDecision);

impl ApprovalGate for StaticApprovalGate {
    fn review(&self, _pending: &PendingOverride) -> ApprovalDecision {
        self.0.clone()
    }
}

// =============================================================================
// Key-Value Store
// =============================================================================

/// String key-value persistence (held carts).
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str) -> Option<String>;
    /// Keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-loads entries (e.g. read back from disk at startup).
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        InMemoryKeyValueStore {
            entries: entries.into_iter().collect(),
        }
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

// =============================================================================
// Transaction Sink
// =============================================================================

/// Receives the transaction record of every settled sale.
pub trait TransactionSink: Send {
    fn hand_off(&self, transaction: Transaction);
}

/// Drops transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TransactionSink for NoopSink {
    fn hand_off(&self, _transaction: Transaction) {}
}

/// Keeps transactions in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    transactions: Arc<Mutex<Vec<Transaction>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything handed off so far.
    pub fn transactions(&self) -> Vec<Transaction> {
        match self.transactions.lock() {
            Ok(list) => list.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl TransactionSink for CollectingSink {
    fn hand_off(&self, transaction: Transaction) {
        match self.transactions.lock() {
            Ok(mut list) => list.push(transaction),
            Err(poisoned) => poisoned.into_inner().push(transaction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::InMemoryCouponCatalog;

    #[test]
    fn test_key_value_prefix_scan() {
        let mut store = InMemoryKeyValueStore::new();
        store.put("held_cart:b", "2".to_string());
        store.put("held_cart:a", "1".to_string());
        store.put("quick_keys", "x".to_string());

        assert_eq!(
            store.keys_with_prefix("held_cart:"),
            vec!["held_cart:a".to_string(), "held_cart:b".to_string()]
        );
        assert_eq!(store.remove("held_cart:a"), Some("1".to_string()));
        assert_eq!(store.get("held_cart:a"), None);
    }

    #[test]
    fn test_shared_catalog() {
        let shared = Arc::new(Mutex::new(InMemoryCouponCatalog::with_defaults(Utc::now())));
        let mut handle = Arc::clone(&shared);
        handle.record_redemption("SAVE10");
        assert_eq!(shared.find("save10").map(|c| c.usage_count), Some(1));
    }
}
