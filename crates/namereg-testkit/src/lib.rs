//! # Name Registry Testkit
//!
//! Testing utilities for the name registry.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Vectors**: fixed fee and lifecycle-boundary cases for the default configuration
//! - **Generators**: Proptest strategies for labels, durations, accounts and secrets
//! - **Fixtures**: A registry with a manual clock and deterministic accounts
//!
//! ## Vectors
//!
//! ```rust
//! use namereg_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors().is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use namereg_testkit::generators::ClaimParams;
//!
//! proptest! {
//!     #[test]
//!     fn claim_is_quoted(params: ClaimParams) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use namereg_testkit::fixtures::{account, TestFixture};
//!
//! let mut fixture = TestFixture::new();
//! let alice = account(1);
//! fixture.claim_paid(alice, "alice", 1).unwrap();
//! assert_eq!(fixture.registry.names_of(&alice).len(), 1);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{account, multi_party_accounts, secret_for, service_fixture, TestFixture, GENESIS};
pub use generators::ClaimParams;
pub use vectors::{price_vectors, state_vectors, verify_all_vectors, PriceVector, StateVector};
