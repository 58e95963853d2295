//! Registry configuration.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::pricing::PriceTable;
use crate::validation::LabelPolicy;

const DAY: u64 = 24 * 60 * 60;

/// Tunable parameters of the registry.
///
/// All time values are in seconds. Durations passed to register and renew
/// are whole periods of `period_length` seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// A commitment must be at least this old before it can be redeemed.
    pub min_commitment_age: u64,
    /// A commitment older than this is permanently unusable.
    pub max_commitment_age: u64,
    /// Window after expiry during which only the holder may renew.
    pub grace_period: u64,
    /// Length of one registration period.
    pub period_length: u64,
    /// Maximum periods per register or renew call.
    pub max_duration: u32,
    /// Minimum operation-sequence spacing between two registrations by the
    /// same caller.
    pub min_registration_spacing: u64,
    /// Shortest label eligible for an allowance fee waiver.
    pub waiver_min_length: usize,
    /// Label length bounds.
    pub labels: LabelPolicy,
    /// Fee per period by label length.
    pub prices: PriceTable,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            min_commitment_age: 60,
            max_commitment_age: DAY,
            grace_period: 90 * DAY,
            period_length: 365 * DAY,
            max_duration: 10,
            min_registration_spacing: 1,
            waiver_min_length: 5,
            labels: LabelPolicy::default(),
            prices: PriceTable::default(),
        }
    }
}

impl RegistryConfig {
    /// Check the configuration is internally coherent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_commitment_age > self.max_commitment_age {
            return Err(ValidationError::InvalidConfig(format!(
                "min_commitment_age {} exceeds max_commitment_age {}",
                self.min_commitment_age, self.max_commitment_age
            )));
        }
        if self.period_length == 0 {
            return Err(ValidationError::InvalidConfig("period_length is zero".into()));
        }
        if self.max_duration == 0 {
            return Err(ValidationError::InvalidConfig("max_duration is zero".into()));
        }
        if self.labels.min_length == 0 || self.labels.min_length > self.labels.max_length {
            return Err(ValidationError::InvalidConfig(format!(
                "label bounds {}..={} are empty",
                self.labels.min_length, self.labels.max_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RegistryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_commitment_window() {
        let config = RegistryConfig {
            min_commitment_age: 100,
            max_commitment_age: 10,
            ..RegistryConfig::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_period_rejected() {
        let config = RegistryConfig {
            period_length: 0,
            ..RegistryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"grace_period": 10, "max_duration": 3}"#).unwrap();
        assert_eq!(config.grace_period, 10);
        assert_eq!(config.max_duration, 3);
        assert_eq!(config.min_commitment_age, 60);
        assert_eq!(config.prices, PriceTable::default());
    }
}
