//! # Money Module
//!
//! Provides the `Money` type and the rounding rules every price, discount
//! and tax amount in the register goes through.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount is an i64 count of cents.                               │
//! │    Percentages are basis points (1 bp = 0.01%).                         │
//! │    A percentage product is rounded half-up exactly ONCE, at the point   │
//! │    where the output field (discount, tax) is produced.                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use checkout_core::money::Money;
//! use checkout_core::types::Percentage;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let line = price.multiply_quantity(3); // $32.97
//! let off = line.percent_of(Percentage::from_bps(1000)); // 10% = $3.297 → $3.30
//! assert_eq!(off.cents(), 330);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::{Percentage, TaxRate};

/// Basis points in 100%.
pub const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents for USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate differences may dip below zero before
///   they are floored; stored results never do
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serializes as a bare integer**: `{"subtotal": 10000}`
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  LineItem.unit_price ──► line total ──► subtotal                        │
/// │                                            │                            │
/// │        item / cart / coupon / loyalty savings                           │
/// │                                            ▼                            │
/// │                         taxable base ──► tax ──► total                  │
/// │                                                   │                     │
/// │                               Tender.amount ──► remaining / change      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(91, 80).cents(), 9180);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Floors the value at zero.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-20).non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(20).non_negative().cents(), 20);
    /// ```
    #[inline]
    pub const fn non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Subtracts `other`, flooring the result at zero.
    ///
    /// Used wherever a "what is left" amount is derived, so that a remaining
    /// balance or taxable base can never go negative.
    #[inline]
    pub const fn saturating_sub(self, other: Money) -> Self {
        Money(self.0 - other.0).non_negative()
    }

    /// Clamps the value into `[0, ceiling]`.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    ///
    /// let ceiling = Money::from_cents(500);
    /// assert_eq!(Money::from_cents(900).clamp_to(ceiling), ceiling);
    /// assert_eq!(Money::from_cents(-1).clamp_to(ceiling), Money::zero());
    /// ```
    #[inline]
    pub fn clamp_to(self, ceiling: Money) -> Self {
        self.min(ceiling.non_negative()).non_negative()
    }

    /// Multiplies money by a quantity, saturating at the i64 bounds.
    ///
    /// Validated prices and quantities never get near the bounds: the
    /// largest line is `MAX_UNIT_PRICE × MAX_ITEM_QUANTITY`.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// assert_eq!(Money::from_cents(i64::MAX / 2).multiply_quantity(3).cents(), i64::MAX);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Returns `percentage` of this amount, rounded half-up to the cent.
    ///
    /// ## Implementation
    /// Integer math in i128: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    /// use checkout_core::types::Percentage;
    ///
    /// let subtotal = Money::from_cents(9500); // $95.00
    /// let ten = Percentage::from_bps(1000);   // 10%
    /// assert_eq!(subtotal.percent_of(ten).cents(), 950);
    /// ```
    pub fn percent_of(&self, percentage: Percentage) -> Money {
        Money::from_cents(round_half_up_bps(self.0, percentage.bps()))
    }

    /// Calculates tax at `rate`, rounded half-up to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    /// use checkout_core::types::TaxRate;
    ///
    /// let base = Money::from_cents(8500);  // $85.00
    /// let rate = TaxRate::from_bps(800);   // 8%
    /// assert_eq!(base.calculate_tax(rate).cents(), 680); // $6.80
    ///
    /// // $10.00 × 8.25% = $0.825 → rounds up to $0.83
    /// let odd = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825));
    /// assert_eq!(odd.cents(), 83);
    /// ```
    ///
    /// ## Where It Runs
    /// ```text
    /// Taxable base: $85.00
    ///      │
    ///      ▼
    /// calculate_tax(8%) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Tax: $6.80 ──► Grand Total: $91.80
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        Money::from_cents(round_half_up_bps(self.0, rate.bps()))
    }
}

/// `amount * bps / 10000`, rounded half away from zero.
fn round_half_up_bps(amount: i64, bps: u32) -> i64 {
    let product = amount as i128 * bps as i128;
    let half = BPS_SCALE / 2;
    let rounded = if product >= 0 {
        (product + half) / BPS_SCALE
    } else {
        (product - half) / BPS_SCALE
    };
    rounded as i64
}

/// Hands out at most `ceiling` across `amounts`, first come first served.
///
/// Each amount receives `min(amount, what is left)`, so the result has the
/// same length as the input and never sums above `ceiling`.
///
/// ## Example
/// ```rust
/// use checkout_core::money::{allocate_in_order, Money};
///
/// let amounts = [Money::from_cents(700), Money::from_cents(500)];
/// let capped = allocate_in_order(&amounts, Money::from_cents(1000));
/// assert_eq!(capped, vec![Money::from_cents(700), Money::from_cents(300)]);
/// ```
pub fn allocate_in_order(amounts: &[Money], ceiling: Money) -> Vec<Money> {
    let mut left = ceiling.non_negative();
    amounts
        .iter()
        .map(|amount| {
            let granted = amount.clamp_to(left);
            left = left.saturating_sub(granted);
            granted
        })
        .collect()
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and debugging. Receipt formatting belongs to the
/// formatting collaborators.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(9180)), "$91.80");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.multiply_quantity(3).cents(), 3000);
    }

    #[test]
    fn test_sum() {
        let amounts = [Money::from_cents(100), Money::from_cents(250)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total.cents(), 350);

        let empty: Money = Vec::<Money>::new().into_iter().sum();
        assert!(empty.is_zero());
    }

    #[test]
    fn test_saturating_sub_never_negative() {
        let small = Money::from_cents(100);
        let large = Money::from_cents(250);
        assert_eq!(small.saturating_sub(large), Money::zero());
        assert_eq!(large.saturating_sub(small).cents(), 150);
    }

    #[test]
    fn test_percent_of_rounds_half_up() {
        // $0.05 × 50% = 2.5 cents → 3 cents
        let amount = Money::from_cents(5);
        assert_eq!(amount.percent_of(Percentage::from_bps(5000)).cents(), 3);

        // $0.05 × 10% = 0.5 cents → 1 cent
        assert_eq!(amount.percent_of(Percentage::from_bps(1000)).cents(), 1);

        // $0.04 × 10% = 0.4 cents → 0 cents
        let amount = Money::from_cents(4);
        assert_eq!(amount.percent_of(Percentage::from_bps(1000)).cents(), 0);
    }

    #[test]
    fn test_percent_of_full_and_zero() {
        let amount = Money::from_cents(12345);
        assert_eq!(amount.percent_of(Percentage::full()), amount);
        assert!(amount.percent_of(Percentage::zero()).is_zero());
    }

    #[test]
    fn test_tax_calculation_basic() {
        let amount = Money::from_cents(1000);
        let tax = amount.calculate_tax(TaxRate::from_bps(1000));
        assert_eq!(tax.cents(), 100);
    }

    #[test]
    fn test_tax_calculation_with_rounding() {
        // $10.00 at 8.25% = $0.825 → $0.83 (round half up)
        let amount = Money::from_cents(1000);
        let tax = amount.calculate_tax(TaxRate::from_bps(825));
        assert_eq!(tax.cents(), 83);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.non_negative(), zero);
    }

    #[test]
    fn test_serializes_as_integer_cents() {
        let json = serde_json::to_string(&Money::from_cents(9180)).unwrap();
        assert_eq!(json, "9180");
    }

    #[test]
    fn test_allocate_in_order_exhausts_ceiling() {
        let amounts = [
            Money::from_cents(400),
            Money::from_cents(400),
            Money::from_cents(400),
        ];
        let allocated = allocate_in_order(&amounts, Money::from_cents(1000));
        assert_eq!(
            allocated,
            vec![
                Money::from_cents(400),
                Money::from_cents(400),
                Money::from_cents(200)
            ]
        );
        assert!(allocate_in_order(&amounts, Money::zero())
            .iter()
            .all(Money::is_zero));
    }
}
