//! # Payment Settlement Ledger
//!
//! Collects tenders against the grand total.
//!
//! ## State Machine
//! ```text
//!                 add_tender / remove_tender
//!                      ┌───────┐
//!                      ▼       │
//!   new() ───────►   OPEN ─────┘
//!                     │  │
//!     settle(total)   │  │  cancel()
//!     Σ ≥ total       │  │
//!           ┌─────────┘  └──────────┐
//!           ▼                       ▼
//!        SETTLED                CANCELLED
//!       (terminal)              (terminal)
//!
//!   settle(total) with Σ < total ──► InsufficientPayment, stays OPEN
//! ```
//!
//! ## Payment Flow
//! ```text
//! Total: $91.80
//!   add_tender(cash, $50.00)  → remaining $41.80
//!   add_tender(card, $41.80)  → remaining  $0.00
//!   settle($91.80)            → SETTLED, change $0.00
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{SettlementStatus, TenderKind};
use crate::validation::validate_payment_amount;

/// A single payment toward the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    #[ts(as = "String")]
    pub id: Uuid,
    pub kind: TenderKind,
    pub amount: Money,
    #[ts(as = "String")]
    pub applied_at: DateTime<Utc>,
}

/// Tenders recorded for the active sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementLedger {
    status: SettlementStatus,
    tenders: Vec<Tender>,
}

impl SettlementLedger {
    /// Creates an open, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SettlementStatus {
        self.status
    }

    /// Tenders in the order they were added.
    pub fn tenders(&self) -> &[Tender] {
        &self.tenders
    }

    pub fn has_tenders(&self) -> bool {
        !self.tenders.is_empty()
    }

    /// Σ tender amounts.
    pub fn paid(&self) -> Money {
        self.tenders.iter().map(|t| t.amount).sum()
    }

    /// Σ amounts of one tender kind.
    pub fn paid_with(&self, kind: TenderKind) -> Money {
        self.tenders
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.amount)
            .sum()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::SettlementClosed {
                status: self.status,
            });
        }
        Ok(())
    }

    /// Records a tender.
    ///
    /// The amount must be positive. Store credit goes through
    /// [`add_store_credit`](Self::add_store_credit) instead.
    pub fn add_tender(
        &mut self,
        kind: TenderKind,
        amount: Money,
        now: DateTime<Utc>,
    ) -> CoreResult<&Tender> {
        self.ensure_open()?;
        validate_payment_amount(amount)?;

        let tender = Tender {
            id: Uuid::new_v4(),
            kind,
            amount,
            applied_at: now,
        };
        info!(kind = %kind, amount = %amount, "Tender added");
        self.tenders.push(tender);
        Ok(&self.tenders[self.tenders.len() - 1])
    }

    /// Records a store-credit tender, capped at what is left of `available`.
    ///
    /// `available` is the customer's total credit; credit already tendered in
    /// this ledger is subtracted first.
    pub fn add_store_credit(
        &mut self,
        amount: Money,
        available: Money,
        now: DateTime<Utc>,
    ) -> CoreResult<&Tender> {
        self.ensure_open()?;
        validate_payment_amount(amount)?;

        let left = available.saturating_sub(self.paid_with(TenderKind::StoreCredit));
        if left.is_zero() {
            return Err(CoreError::InsufficientStoreCredit { requested: amount });
        }

        let capped = amount.min(left);
        if capped < amount {
            debug!(requested = %amount, capped = %capped, "Store credit tender capped");
        }
        self.add_tender(TenderKind::StoreCredit, capped, now)
    }

    /// Removes a tender by id.
    pub fn remove_tender(&mut self, id: Uuid) -> CoreResult<Tender> {
        self.ensure_open()?;
        let index = self
            .tenders
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::TenderNotFound(id.to_string()))?;
        let removed = self.tenders.remove(index);
        info!(kind = %removed.kind, amount = %removed.amount, "Tender removed");
        Ok(removed)
    }

    /// Settles against `total`, returning the change.
    ///
    /// ## Errors
    /// - `InsufficientPayment` when Σ tenders < total; the ledger stays open
    /// - `SettlementClosed` when already settled or cancelled
    pub fn settle(&mut self, total: Money) -> CoreResult<Money> {
        self.ensure_open()?;
        let paid = self.paid();
        if paid < total {
            return Err(CoreError::InsufficientPayment {
                total,
                paid,
                remaining: total - paid,
            });
        }
        self.status = SettlementStatus::Settled;
        Ok(paid - total)
    }

    /// Abandons the payment. Tenders are discarded.
    pub fn cancel(&mut self) -> CoreResult<Vec<Tender>> {
        self.ensure_open()?;
        self.status = SettlementStatus::Cancelled;
        Ok(std::mem::take(&mut self.tenders))
    }
}
