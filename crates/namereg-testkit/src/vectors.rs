//! Fixed pricing and lifecycle vectors.
//!
//! Each vector pins one input to its expected output under the default
//! configuration, so a change to tiers or state boundaries shows up as a
//! named failure.

use namereg_core::{Amount, NameState, PriceTable, RegistryConfig, Timestamp};

/// An expected fee.
#[derive(Debug, Clone)]
pub struct PriceVector {
    pub name: &'static str,
    pub label: &'static str,
    pub duration: u32,
    pub expected: Amount,
}

/// An expected lifecycle state at an offset from expiry.
#[derive(Debug, Clone)]
pub struct StateVector {
    pub name: &'static str,
    pub expires_at: Timestamp,
    pub now: Timestamp,
    pub expected: NameState,
}

/// Fee vectors for the default price table.
pub fn price_vectors() -> Vec<PriceVector> {
    vec![
        PriceVector {
            name: "three chars, one period",
            label: "abc",
            duration: 1,
            expected: 640_000,
        },
        PriceVector {
            name: "three chars, max periods",
            label: "x-1",
            duration: 10,
            expected: 6_400_000,
        },
        PriceVector {
            name: "four chars, two periods",
            label: "abcd",
            duration: 2,
            expected: 320_000,
        },
        PriceVector {
            name: "five chars, one period",
            label: "alice",
            duration: 1,
            expected: 5_000,
        },
        PriceVector {
            name: "longest label, three periods",
            label: "a23456789012345678901234567890123456789012345678901234567890123",
            duration: 3,
            expected: 15_000,
        },
    ]
}

const EXPIRY: Timestamp = 1_000_000_000;
const GRACE: u64 = 90 * 24 * 60 * 60;

/// State vectors around the expiry and grace boundaries.
pub fn state_vectors() -> Vec<StateVector> {
    vec![
        StateVector {
            name: "one second before expiry",
            expires_at: EXPIRY,
            now: EXPIRY - 1,
            expected: NameState::Active,
        },
        StateVector {
            name: "at expiry",
            expires_at: EXPIRY,
            now: EXPIRY,
            expected: NameState::Grace,
        },
        StateVector {
            name: "last second of grace",
            expires_at: EXPIRY,
            now: EXPIRY + GRACE - 1,
            expected: NameState::Grace,
        },
        StateVector {
            name: "end of grace",
            expires_at: EXPIRY,
            now: EXPIRY + GRACE,
            expected: NameState::Burnable,
        },
        StateVector {
            name: "grace end overflows",
            expires_at: u64::MAX - 10,
            now: u64::MAX,
            expected: NameState::Grace,
        },
    ]
}

/// Check every vector against the default configuration.
///
/// Returns the name and detail of every mismatch.
pub fn verify_all_vectors() -> Vec<(&'static str, String)> {
    let config = RegistryConfig::default();
    let table: PriceTable = config.prices;
    let mut failures = Vec::new();

    for v in price_vectors() {
        match table.fee(v.label.len(), v.duration, config.max_duration) {
            Ok(fee) if fee == v.expected => {}
            other => failures.push((v.name, format!("expected {}, got {:?}", v.expected, other))),
        }
    }

    for v in state_vectors() {
        let state = NameState::at(v.expires_at, config.grace_period, v.now);
        if state != v.expected {
            failures.push((v.name, format!("expected {:?}, got {:?}", v.expected, state)));
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_pass() {
        let failures = verify_all_vectors();
        assert!(failures.is_empty(), "vector failures: {failures:?}");
    }

    #[test]
    fn test_vector_labels_are_valid() {
        for v in price_vectors() {
            assert!(namereg_core::Label::parse(v.label).is_ok(), "{}", v.name);
        }
    }

    #[test]
    fn test_grace_matches_default() {
        assert_eq!(RegistryConfig::default().grace_period, GRACE);
    }
}
