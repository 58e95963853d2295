//! Proptest generators for property-based testing.

use proptest::prelude::*;

use namereg_core::{Address, Keypair, Secret};

/// A label the default policy accepts: 3-63 chars of `a-z0-9-`, no edge hyphen.
pub fn valid_label() -> impl Strategy<Value = String> {
    "[a-z0-9]([a-z0-9-]{1,61})[a-z0-9]".prop_map(String::from)
}

/// A label in the cheapest pricing tier.
pub fn long_label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{4,20}".prop_map(String::from)
}

/// A label the default policy rejects.
pub fn invalid_label() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z0-9]{1,2}".prop_map(String::from),
        "[a-z0-9]{64,80}".prop_map(String::from),
        "-[a-z0-9]{2,10}".prop_map(String::from),
        "[a-z0-9]{2,10}-".prop_map(String::from),
        "[a-z]{1,5}[A-Z_. ][a-z]{1,5}".prop_map(String::from),
    ]
}

/// A duration within the default bounds.
pub fn duration() -> impl Strategy<Value = u32> {
    1u32..=10
}

/// An account address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed).address())
}

/// A commitment secret.
pub fn secret() -> impl Strategy<Value = Secret> {
    any::<[u8; 32]>().prop_map(Secret::from_bytes)
}

/// Parameters for one commit-and-register attempt.
#[derive(Debug, Clone)]
pub struct ClaimParams {
    pub claimant: Address,
    pub label: String,
    pub duration: u32,
    pub secret: Secret,
}

impl Arbitrary for ClaimParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (address(), valid_label(), duration(), secret())
            .prop_map(|(claimant, label, duration, secret)| ClaimParams {
                claimant,
                label,
                duration,
                secret,
            })
            .boxed()
    }
}
