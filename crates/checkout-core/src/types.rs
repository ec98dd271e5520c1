//! # Domain Types
//!
//! Small shared value types used throughout the pricing core.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │   Percentage    │   │  DiscountValue  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  bps (u32)      │   │  Percentage     │       │
//! │  │  800 = 8%       │   │  ≤ 10000        │   │  Fixed(Money)   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   TenderKind    │   │    Customer     │   │ SettlementStatus│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Cash, Card,    │   │  loyalty points │   │  Open           │       │
//! │  │  Wallet, Gift,  │   │  store credit   │   │  Settled        │       │
//! │  │  StoreCredit    │   │  tier           │   │  Cancelled      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 800 bps = 8%
///
/// The rate is configuration owned by the store, not by this crate; see
/// [`crate::config::PricingConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A percentage in basis points, bounded to `0..=10000` by validation.
///
/// Coupon values, discount percentages and stacking caps all use this type,
/// so `10%` is always `Percentage::from_bps(1000)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from whole percent (10 → 10%).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        Percentage(percent * 100)
    }

    /// Returns the value in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// 0%.
    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    /// 100%.
    #[inline]
    pub const fn full() -> Self {
        Percentage(10_000)
    }

    /// Whether the value is within `0..=100%`.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 <= 10_000
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Discount Value
// =============================================================================

/// The value of a discount: a percentage or a fixed amount.
///
/// Shared by per-item discounts, the cart discount and category coupons.
///
/// ## Serialized Shape
/// ```json
/// { "kind": "percentage", "value": 1000 }
/// { "kind": "fixed", "value": 500 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountValue {
    /// Percentage of the base amount.
    Percentage { value: Percentage },
    /// Fixed amount, never more than the base amount.
    Fixed { value: Money },
}

impl DiscountValue {
    /// Shorthand for a percentage discount in whole percent.
    pub const fn percent(percent: u32) -> Self {
        DiscountValue::Percentage {
            value: Percentage::from_percent(percent),
        }
    }

    /// Shorthand for a fixed discount in cents.
    pub const fn fixed_cents(cents: i64) -> Self {
        DiscountValue::Fixed {
            value: Money::from_cents(cents),
        }
    }
}

// =============================================================================
// Line Item Kind
// =============================================================================

/// What a line item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A physical product.
    #[default]
    Product,
    /// A service (installation, repair, ...).
    Service,
}

// =============================================================================
// Tender Kind
// =============================================================================

/// A payment instrument.
///
/// All tenders are modelled as already-authorized amounts; there is no
/// processor integration in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TenderKind {
    /// Physical cash.
    Cash,
    /// Card on an external terminal.
    Card,
    /// Mobile wallet.
    Wallet,
    /// Gift card.
    GiftCard,
    /// Store credit, capped at the customer's available credit.
    StoreCredit,
}

impl fmt::Display for TenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenderKind::Cash => write!(f, "cash"),
            TenderKind::Card => write!(f, "card"),
            TenderKind::Wallet => write!(f, "wallet"),
            TenderKind::GiftCard => write!(f, "gift_card"),
            TenderKind::StoreCredit => write!(f, "store_credit"),
        }
    }
}

impl FromStr for TenderKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(TenderKind::Cash),
            "card" | "credit" | "debit" => Ok(TenderKind::Card),
            "wallet" => Ok(TenderKind::Wallet),
            "gift_card" | "giftcard" => Ok(TenderKind::GiftCard),
            "store_credit" | "credit_note" => Ok(TenderKind::StoreCredit),
            _ => Err(ValidationError::NotAllowed {
                field: "tender kind".to_string(),
                allowed: ["cash", "card", "wallet", "gift_card", "store_credit"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Settlement Status
// =============================================================================

/// Lifecycle of a payment settlement ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    /// Tenders may be added and removed.
    #[default]
    Open,
    /// Tenders covered the total; terminal.
    Settled,
    /// Payment was abandoned; terminal.
    Cancelled,
}

impl SettlementStatus {
    /// Whether no further tender changes are accepted.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, SettlementStatus::Settled | SettlementStatus::Cancelled)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer as returned by the external customer lookup.
///
/// The session references the customer; it never creates one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Loyalty points currently available for redemption.
    #[serde(default)]
    pub loyalty_points: u64,
    /// Store credit available for `store_credit` tenders.
    #[serde(default)]
    pub store_credit: Money,
    #[serde(default)]
    pub tier: Option<String>,
}

impl Customer {
    /// Creates a customer with no points and no credit.
    pub fn new(id: impl Into<String>) -> Self {
        Customer {
            id: id.into(),
            name: None,
            loyalty_points: 0,
            store_credit: Money::zero(),
            tier: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(8.0).bps(), 800);
    }

    #[test]
    fn test_percentage_display_and_bounds() {
        assert_eq!(Percentage::from_percent(10).to_string(), "10.00%");
        assert_eq!(Percentage::from_bps(825).to_string(), "8.25%");
        assert!(Percentage::full().is_valid());
        assert!(!Percentage::from_bps(10_001).is_valid());
    }

    #[test]
    fn test_discount_value_serialization() {
        let json = serde_json::to_value(DiscountValue::percent(10)).unwrap();
        assert_eq!(json["kind"], "percentage");
        assert_eq!(json["value"], 1000);

        let parsed: DiscountValue =
            serde_json::from_str(r#"{"kind":"fixed","value":500}"#).unwrap();
        assert_eq!(parsed, DiscountValue::fixed_cents(500));
    }

    #[test]
    fn test_tender_kind_parsing() {
        assert_eq!("cash".parse::<TenderKind>().unwrap(), TenderKind::Cash);
        assert_eq!("Debit".parse::<TenderKind>().unwrap(), TenderKind::Card);
        assert_eq!(
            "store_credit".parse::<TenderKind>().unwrap(),
            TenderKind::StoreCredit
        );
        assert!("cheque".parse::<TenderKind>().is_err());
    }

    #[test]
    fn test_settlement_status_terminal() {
        assert!(!SettlementStatus::default().is_terminal());
        assert!(SettlementStatus::Settled.is_terminal());
        assert!(SettlementStatus::Cancelled.is_terminal());
    }
}
