//! Pricing by label length.
//!
//! `fee(length, duration) = tier_price(length) × duration`. Shorter names
//! sit in pricier tiers.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::Amount;
use crate::validation::validate_duration;

/// Fee-per-period for each length tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTable {
    /// Labels of three characters or fewer.
    pub tier3: Amount,
    /// Labels of exactly four characters.
    pub tier4: Amount,
    /// Labels of five characters or more.
    pub tier5plus: Amount,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            tier3: 640_000,
            tier4: 160_000,
            tier5plus: 5_000,
        }
    }
}

impl PriceTable {
    /// Price of one period for a label of the given length.
    pub fn price_per_period(&self, length: usize) -> Amount {
        match length {
            0..=3 => self.tier3,
            4 => self.tier4,
            _ => self.tier5plus,
        }
    }

    /// Total fee for `duration` periods.
    ///
    /// Rejects a zero duration or one above `max_duration`, and any product
    /// that would overflow.
    pub fn fee(
        &self,
        length: usize,
        duration: u32,
        max_duration: u32,
    ) -> Result<Amount, ValidationError> {
        validate_duration(duration, max_duration)?;
        self.price_per_period(length)
            .checked_mul(Amount::from(duration))
            .ok_or(ValidationError::FeeOverflow)
    }
}
