//! # Cart Ledger
//!
//! The ordered set of line items in the active sale.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Ledger Operations                               │
//! │                                                                         │
//! │  Command                  Cart Change                                   │
//! │  ───────                  ───────────                                   │
//! │                                                                         │
//! │  add_item() ────────────► push line, or merge: qty += n                 │
//! │                                                                         │
//! │  update_quantity() ─────► items[i].qty = n   (n ≤ 0 removes the line)   │
//! │                                                                         │
//! │  remove_item() ─────────► items.remove(i)                               │
//! │                                                                         │
//! │  apply_item_discount() ─► items[i].discount = Some(value)               │
//! │                                                                         │
//! │  NOTE: every operation validates first and mutates last, so a rejected  │
//! │        command leaves the cart untouched.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::discount;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{DiscountValue, ItemKind};
use crate::validation::{
    validate_cart_size, validate_discount_value, validate_item_id, validate_item_name,
    validate_price,
};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// A line in the cart.
///
/// ## Design Notes
/// The unit price is frozen when the line is added. Only an approved price
/// override changes it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product or service identifier; lines are unique by id.
    pub id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub category: String,
    #[serde(default)]
    pub kind: ItemKind,
    /// Optional per-line discount.
    #[serde(default)]
    pub discount: Option<DiscountValue>,
}

impl LineItem {
    /// Creates a product line without a discount.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
        category: impl Into<String>,
    ) -> Self {
        LineItem {
            id: id.into(),
            name: name.into(),
            unit_price,
            quantity,
            category: category.into(),
            kind: ItemKind::Product,
            discount: None,
        }
    }

    /// Marks the line as a service.
    pub fn service(mut self) -> Self {
        self.kind = ItemKind::Service;
        self
    }

    /// Line total before any discount (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// The per-line discount amount, never more than the line total.
    ///
    /// A fixed discount applies to the whole line, not to each unit.
    pub fn discount_amount(&self) -> Money {
        match &self.discount {
            Some(value) => discount::resolve(self.line_total(), value),
            None => Money::zero(),
        }
    }

    /// Case-insensitive category match.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.trim().eq_ignore_ascii_case(category.trim())
    }
}

/// The cart ledger.
///
/// ## Invariants
/// - Lines are unique by `id` (adding the same id increases quantity)
/// - Every quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<LineItem>,
    created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Rebuilds a cart from lines, validating each as if it were added.
    pub fn from_items(items: Vec<LineItem>) -> CoreResult<Self> {
        let mut cart = Cart::new();
        for item in items {
            cart.add_item(item)?;
        }
        Ok(cart)
    }

    /// Adds a line, or merges it into an existing line with the same id.
    ///
    /// ## Behavior
    /// - Same id already present: quantity increases; the existing price and
    ///   discount are kept
    /// - Otherwise the line is appended
    pub fn add_item(&mut self, item: LineItem) -> CoreResult<()> {
        validate_item_id(&item.id)?;
        validate_item_name(&item.name)?;
        validate_price(item.unit_price)?;
        if item.quantity <= 0 {
            return Err(CoreError::InvalidQuantity(item.quantity));
        }
        if let Some(value) = &item.discount {
            validate_discount_value(value)?;
        }

        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            let new_qty = existing.quantity + item.quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            existing.quantity = new_qty;
            return Ok(());
        }

        if item.quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: item.quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if validate_cart_size(self.items.len()).is_err() {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(item);
        Ok(())
    }

    /// Removes a line by id and returns it.
    pub fn remove_item(&mut self, id: &str) -> CoreResult<LineItem> {
        let index = self.position(id)?;
        Ok(self.items.remove(index))
    }

    /// Sets the quantity of a line.
    ///
    /// ## Behavior
    /// - quantity ≤ 0: removes the line
    /// - quantity above the maximum: rejected
    pub fn update_quantity(&mut self, id: &str, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return self.remove_item(id).map(|_| ());
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let index = self.position(id)?;
        self.items[index].quantity = quantity;
        Ok(())
    }

    /// Sets (or replaces) the discount of a line.
    pub fn apply_item_discount(&mut self, id: &str, value: DiscountValue) -> CoreResult<()> {
        validate_discount_value(&value)?;
        let index = self.position(id)?;
        self.items[index].discount = Some(value);
        Ok(())
    }

    /// Clears the discount of a line.
    pub fn remove_item_discount(&mut self, id: &str) -> CoreResult<()> {
        let index = self.position(id)?;
        self.items[index].discount = None;
        Ok(())
    }

    /// Changes the unit price of a line. Only reached after an approved
    /// price override.
    pub fn set_unit_price(&mut self, id: &str, price: Money) -> CoreResult<Money> {
        validate_price(price)?;
        let index = self.position(id)?;
        let previous = self.items[index].unit_price;
        self.items[index].unit_price = price;
        Ok(previous)
    }

    /// Looks up a line by id.
    pub fn get(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Lines in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// When the cart was created/last cleared.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Clears all lines.
    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    /// Returns the number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Σ(unit price × quantity), before any discount.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Σ per-line discount amounts.
    pub fn item_discounts(&self) -> Money {
        self.items.iter().map(LineItem::discount_amount).sum()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, id: &str) -> CoreResult<usize> {
        self.items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| CoreError::ItemNotFound(id.to_string()))
    }
}
