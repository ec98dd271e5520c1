//! # Pricing Configuration
//!
//! Store policy the pricing core reads but does not own: tax rate, loyalty
//! conversion and override thresholds.
//!
//! ```toml
//! [pricing]
//! tax_rate = 800                  # basis points, 8%
//!
//! [pricing.loyalty]
//! enabled = true
//! point_value = 1                 # cents per point
//! earn_rate = 100                 # points per currency unit, in hundredths
//!
//! [pricing.overrides]
//! max_percentage_without_override = 2000
//! ```

use serde::{Deserialize, Serialize};

use crate::approval::OverridePolicy;
use crate::error::ValidationError;
use crate::loyalty::LoyaltySettings;
use crate::types::TaxRate;
use crate::validation::{validate_price, validate_tax_rate_bps, ValidationResult};

fn default_tax_rate() -> TaxRate {
    TaxRate::from_bps(800)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_tax_rate")]
    pub tax_rate: TaxRate,
    #[serde(default)]
    pub loyalty: LoyaltySettings,
    #[serde(default)]
    pub overrides: OverridePolicy,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            tax_rate: default_tax_rate(),
            loyalty: LoyaltySettings::default(),
            overrides: OverridePolicy::default(),
        }
    }
}

impl PricingConfig {
    /// Checks every value is in range.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_tax_rate_bps(self.tax_rate.bps())?;

        if self.loyalty.enabled && !self.loyalty.point_value.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "loyalty point value".to_string(),
            });
        }

        if let Some(max) = self.overrides.max_percentage_without_override {
            if max > 10_000 {
                return Err(ValidationError::OutOfRange {
                    field: "max percentage without override".to_string(),
                    min: 0,
                    max: 10_000,
                });
            }
        }
        if let Some(max) = self.overrides.max_fixed_without_override {
            validate_price(max)?;
        }

        Ok(())
    }
}
