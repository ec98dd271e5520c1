//! # Loyalty Point Ledger
//!
//! Redeemed points become a discount; the final total earns new points.
//!
//! ```text
//! redeem_points(n) ──► n × point value ──► totals (clamped to what is left)
//!
//! settle() ──► points_earned(total) = ⌊total_cents × earn_rate / 10000⌋
//!              earn_rate 100 → 1 point per currency unit
//! ```
//!
//! Points are only earned on a settled sale. Cancelling never touches the
//! customer's balance.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, BPS_SCALE};

fn default_true() -> bool {
    true
}

fn default_point_value() -> Money {
    Money::from_cents(1)
}

fn default_earn_rate() -> u32 {
    100
}

/// How points convert to and from money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Value of one point when redeemed.
    #[serde(default = "default_point_value")]
    pub point_value: Money,
    /// Points earned per currency unit, in hundredths.
    #[serde(default = "default_earn_rate")]
    pub earn_rate: u32,
}

impl Default for LoyaltySettings {
    fn default() -> Self {
        LoyaltySettings {
            enabled: default_true(),
            point_value: default_point_value(),
            earn_rate: default_earn_rate(),
        }
    }
}

impl LoyaltySettings {
    /// Value of `points` when redeemed.
    pub fn redemption_value(&self, points: u64) -> Money {
        let cents = (points as i128 * self.point_value.cents() as i128).min(i64::MAX as i128);
        Money::from_cents(cents as i64)
    }

    /// Points needed to cover `value`, rounded up.
    pub fn points_for(&self, value: Money) -> u64 {
        let per_point = self.point_value.cents();
        if per_point <= 0 || !value.is_positive() {
            return 0;
        }
        (value.cents() as u64).div_ceil(per_point as u64)
    }

    /// Points earned on a settled total, rounded down.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::loyalty::LoyaltySettings;
    /// use checkout_core::money::Money;
    ///
    /// let settings = LoyaltySettings::default();
    /// assert_eq!(settings.points_earned(Money::from_cents(9180)), 91);
    /// ```
    pub fn points_earned(&self, total: Money) -> u64 {
        if !self.enabled || !total.is_positive() {
            return 0;
        }
        (total.cents() as i128 * self.earn_rate as i128 / BPS_SCALE) as u64
    }
}

/// Points of the attached customer, and how many are being redeemed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccount {
    pub points_available: u64,
    pub points_to_redeem: u64,
}

impl LoyaltyAccount {
    pub fn new(points_available: u64) -> Self {
        LoyaltyAccount {
            points_available,
            points_to_redeem: 0,
        }
    }

    /// Sets the number of points to redeem on this sale.
    ///
    /// Replaces any earlier request; `0` cancels redemption.
    pub fn redeem(&mut self, points: u64) -> CoreResult<()> {
        if points > self.points_available {
            return Err(CoreError::InsufficientPoints {
                requested: points,
                available: self.points_available,
            });
        }
        self.points_to_redeem = points;
        Ok(())
    }

    /// Balance after the sale: `available − used + earned`.
    pub fn balance_after(&self, used: u64, earned: u64) -> u64 {
        self.points_available.saturating_sub(used) + earned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeem_rejects_more_than_available() {
        let mut account = LoyaltyAccount::new(100);
        assert!(account.redeem(100).is_ok());
        assert_eq!(account.points_to_redeem, 100);

        let err = account.redeem(101).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientPoints {
                requested: 101,
                available: 100
            }
        );
        assert_eq!(account.points_to_redeem, 100);
    }

    #[test]
    fn test_points_earned_floor() {
        let settings = LoyaltySettings {
            earn_rate: 150,
            ..LoyaltySettings::default()
        };
        // $10.99 × 1.5 = 16.485 → 16
        assert_eq!(settings.points_earned(Money::from_cents(1099)), 16);
        assert_eq!(settings.points_earned(Money::zero()), 0);

        let disabled = LoyaltySettings {
            enabled: false,
            ..LoyaltySettings::default()
        };
        assert_eq!(disabled.points_earned(Money::from_cents(10000)), 0);
    }

    #[test]
    fn test_value_and_points_needed() {
        let settings = LoyaltySettings {
            point_value: Money::from_cents(5),
            ..LoyaltySettings::default()
        };
        assert_eq!(settings.redemption_value(40).cents(), 200);
        assert_eq!(settings.points_for(Money::from_cents(201)), 41);
        assert_eq!(settings.points_for(Money::zero()), 0);
    }

    #[test]
    fn test_balance_after() {
        let account = LoyaltyAccount::new(500);
        assert_eq!(account.balance_after(200, 91), 391);
    }
}
