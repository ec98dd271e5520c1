//! # Hand-off Worker
//!
//! Everything the register writes outside the session goes through one
//! channel drained by a background task. Commands never wait on it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Hand-off Flow                                     │
//! │                                                                         │
//! │  command thread                         background task                 │
//! │  ──────────────                         ───────────────                 │
//! │  ChannelSink::hand_off(tx)  ─┐                                          │
//! │  PersistentCatalog          ─┤  mpsc    HandoffWorker::run()            │
//! │    record_redemption(code)  ─┼───────►    ├── Transaction  → log        │
//! │  CatalogState::create/..    ─┤            ├── Coupon*      → coupons    │
//! │  MirroredStore::put/remove  ─┘            └── KeyValue*    → key_value  │
//! │                                                                         │
//! │  A failed write is logged; the in-memory state stays authoritative     │
//! │  for the rest of the run.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use checkout_core::coupon::Coupon;
use checkout_core::ports::TransactionSink;
use checkout_core::receipt::Transaction;
use checkout_db::{Database, DbResult};

/// One unit of work for the background task.
#[derive(Debug, Clone)]
pub enum Handoff {
    /// A settled sale for downstream delivery.
    Transaction(Box<Transaction>),
    CouponRedeemed(String),
    CouponCreated(Coupon),
    CouponUpdated(Coupon),
    CouponDeleted(String),
    CatalogReset(DateTime<Utc>),
    KeyValuePut { key: String, value: String },
    KeyValueRemoved(String),
}

/// Sending side, cloned into every component that hands work off.
#[derive(Debug, Clone)]
pub struct HandoffHandle {
    tx: mpsc::UnboundedSender<Handoff>,
}

impl HandoffHandle {
    /// Queues `work`. Never blocks; logs if the worker is gone.
    pub fn send(&self, work: Handoff) {
        if let Err(e) = self.tx.send(work) {
            warn!(work = ?e.0, "Hand-off worker stopped, work dropped");
        }
    }
}

/// Creates the channel. The receiver goes to [`HandoffWorker::new`].
pub fn channel() -> (HandoffHandle, mpsc::UnboundedReceiver<Handoff>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (HandoffHandle { tx }, rx)
}

// =============================================================================
// Transaction Sink
// =============================================================================

/// [`TransactionSink`] that queues settled sales for the worker.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    handle: HandoffHandle,
}

impl ChannelSink {
    pub fn new(handle: HandoffHandle) -> Self {
        ChannelSink { handle }
    }
}

impl TransactionSink for ChannelSink {
    fn hand_off(&self, transaction: Transaction) {
        self.handle.send(Handoff::Transaction(Box::new(transaction)));
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Drains the hand-off channel into the database.
pub struct HandoffWorker {
    db: Database,
    rx: mpsc::UnboundedReceiver<Handoff>,
}

impl HandoffWorker {
    pub fn new(db: Database, rx: mpsc::UnboundedReceiver<Handoff>) -> Self {
        HandoffWorker { db, rx }
    }

    /// Runs until every [`HandoffHandle`] is dropped and the queue is empty.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Hand-off worker starting");

        while let Some(work) = self.rx.recv().await {
            if let Err(e) = self.apply(&work).await {
                error!(error = %e, ?work, "Hand-off failed");
            }
        }

        info!("Hand-off worker stopped");
    }

    async fn apply(&self, work: &Handoff) -> DbResult<()> {
        match work {
            Handoff::Transaction(transaction) => {
                info!(
                    receipt_number = %transaction.receipt_number,
                    total = %transaction.total,
                    tenders = transaction.tenders.len(),
                    "Transaction handed off"
                );
            }
            Handoff::CouponRedeemed(code) => {
                self.db.coupons().increment_usage(code).await?;
            }
            Handoff::CouponCreated(coupon) => {
                self.db.coupons().create(coupon).await?;
            }
            Handoff::CouponUpdated(coupon) => {
                self.db.coupons().update(coupon).await?;
            }
            Handoff::CouponDeleted(code) => {
                self.db.coupons().delete(code).await?;
            }
            Handoff::CatalogReset(now) => {
                self.db.coupons().reset_to_defaults(*now).await?;
            }
            Handoff::KeyValuePut { key, value } => {
                self.db.kv().put(key, value).await?;
            }
            Handoff::KeyValueRemoved(key) => {
                if !self.db.kv().remove(key).await? {
                    debug!(key = %key, "Key was not stored");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::coupon::default_coupons;
    use checkout_db::DbConfig;

    #[tokio::test]
    async fn test_worker_drains_queue_before_stopping() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (handle, rx) = channel();
        let worker = tokio::spawn(HandoffWorker::new(db.clone(), rx).run());

        let now = Utc::now();
        handle.send(Handoff::CatalogReset(now));
        handle.send(Handoff::CouponRedeemed("SAVE10".to_string()));
        handle.send(Handoff::KeyValuePut {
            key: "held_cart:1".to_string(),
            value: "{}".to_string(),
        });
        drop(handle);
        worker.await.unwrap();

        let save10 = db.coupons().get("SAVE10").await.unwrap().unwrap();
        assert_eq!(save10.usage_count, 1);
        assert_eq!(
            db.coupons().count().await.unwrap(),
            default_coupons(now).len() as i64
        );
        assert_eq!(db.kv().get("held_cart:1").await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_worker() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (handle, rx) = channel();
        let worker = tokio::spawn(HandoffWorker::new(db.clone(), rx).run());

        handle.send(Handoff::CouponDeleted("MISSING".to_string()));
        handle.send(Handoff::KeyValuePut {
            key: "k".to_string(),
            value: "v".to_string(),
        });
        drop(handle);
        worker.await.unwrap();

        assert_eq!(db.kv().get("k").await.unwrap().as_deref(), Some("v"));
    }
}
