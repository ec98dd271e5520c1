//! # Transaction Record
//!
//! The immutable record of a settled sale, handed to whatever prints,
//! emails or files it. Field names (camelCase) are the contract those
//! collaborators read; they do not change once emitted.
//!
//! ```text
//! settle()
//!   │
//!   ├── Totals (final)
//!   ├── cart lines
//!   ├── tenders
//!   └── loyalty deltas
//!          │
//!          ▼
//!   Transaction::build() ──► TransactionSink::hand_off()
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::LineItem;
use crate::money::Money;
use crate::settlement::Tender;
use crate::totals::{CouponSaving, Totals};
use crate::types::{DiscountValue, ItemKind, TaxRate};

/// A line as printed on the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub id: String,
    pub name: String,
    pub category: String,
    pub kind: ItemKind,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
    pub discount: Option<DiscountValue>,
    pub discount_amount: Money,
}

impl From<&LineItem> for ReceiptLine {
    fn from(item: &LineItem) -> Self {
        ReceiptLine {
            id: item.id.clone(),
            name: item.name.clone(),
            category: item.category.clone(),
            kind: item.kind,
            unit_price: item.unit_price,
            quantity: item.quantity,
            line_total: item.line_total(),
            discount: item.discount,
            discount_amount: item.discount_amount(),
        }
    }
}

/// A settled sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[ts(as = "String")]
    pub id: Uuid,
    /// `YYYYMMDD-HHMMSS-NNNN`
    pub receipt_number: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub customer_id: Option<String>,
    pub items: Vec<ReceiptLine>,

    pub subtotal: Money,
    pub item_discounts: Money,
    pub cart_discount: Money,
    pub coupons: Vec<CouponSaving>,
    pub coupon_discounts: Money,
    pub loyalty_discount: Money,
    pub total_savings: Money,
    pub taxable_base: Money,
    pub tax_rate: TaxRate,
    pub tax: Money,
    pub total: Money,

    pub tenders: Vec<Tender>,
    pub paid: Money,
    pub change: Money,

    pub points_used: u64,
    pub points_earned: u64,
}

/// Loyalty effect of a sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointDeltas {
    pub used: u64,
    pub earned: u64,
}

impl Transaction {
    /// Assembles the record from the final state of the sale.
    pub fn build(
        created_at: DateTime<Utc>,
        customer_id: Option<String>,
        items: &[LineItem],
        totals: Totals,
        tenders: Vec<Tender>,
        points: PointDeltas,
    ) -> Self {
        let id = Uuid::new_v4();
        Transaction {
            id,
            receipt_number: receipt_number(created_at, id),
            created_at,
            customer_id,
            items: items.iter().map(ReceiptLine::from).collect(),
            subtotal: totals.subtotal,
            item_discounts: totals.item_discounts,
            cart_discount: totals.cart_discount,
            coupons: totals.coupons,
            coupon_discounts: totals.coupon_discounts,
            loyalty_discount: totals.loyalty_discount,
            total_savings: totals.total_savings,
            taxable_base: totals.taxable_base,
            tax_rate: totals.tax_rate,
            tax: totals.tax,
            total: totals.total,
            tenders,
            paid: totals.paid,
            change: totals.change,
            points_used: points.used,
            points_earned: points.earned,
        }
    }
}

/// Receipt number from the sale time and four digits of its id.
pub fn receipt_number(at: DateTime<Utc>, id: Uuid) -> String {
    let suffix = id.as_u128() % 10_000;
    format!("{}-{:04}", at.format("%Y%m%d-%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_receipt_number_format() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 5, 7).unwrap();
        let number = receipt_number(at, Uuid::from_u128(123_456));
        assert_eq!(number, "20260314-090507-3456");
    }

    #[test]
    fn test_transaction_json_is_camel_case() {
        let item = LineItem::new("sku-1", "Widget", Money::from_cents(1000), 2, "misc");
        let totals = Totals {
            subtotal: Money::from_cents(2000),
            total: Money::from_cents(2000),
            paid: Money::from_cents(2000),
            ..Totals::default()
        };
        let tx = Transaction::build(
            Utc::now(),
            Some("cust-1".to_string()),
            &[item],
            totals,
            Vec::new(),
            PointDeltas { used: 0, earned: 20 },
        );

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["receiptNumber"], tx.receipt_number);
        assert_eq!(json["customerId"], "cust-1");
        assert_eq!(json["items"][0]["lineTotal"], 2000);
        assert_eq!(json["pointsEarned"], 20);
        assert!(json.get("totalSavings").is_some());
    }
}
