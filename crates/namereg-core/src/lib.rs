//! # Name Registry Core
//!
//! Pure primitives for the name registry: labels, commitments, pricing,
//! lifecycle state, configuration, and registry events.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over the registry's data types.
//!
//! ## Key Types
//!
//! - [`Label`] - A validated, human-readable name (without suffix)
//! - [`Address`] - An account identifier (holder, claimant, administrator)
//! - [`TokenId`] - The ownership token minted for a registration
//! - [`CommitmentHash`] - The opaque commit-reveal promise `H(label, claimant, secret)`
//! - [`PriceTable`] - Fee-per-period keyed by label length
//! - [`NameState`] - Lifecycle state derived from expiry and the current time
//! - [`RegistryEvent`] - The externally observable record of a state change
//!
//! ## Canonicalization
//!
//! Events are encoded using deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod commitment;
pub mod config;
pub mod crypto;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod pricing;
pub mod types;
pub mod validation;

pub use canonical::{decode_event, encode_event};
pub use commitment::{CommitmentHash, Secret};
pub use config::RegistryConfig;
pub use crypto::{Address, Blake3Hash, Keypair};
pub use error::{CoreError, ValidationError};
pub use event::{EventKind, RegistryEvent};
pub use lifecycle::NameState;
pub use pricing::PriceTable;
pub use types::{Amount, Label, Timestamp, TokenId};
pub use validation::{validate_duration, validate_label, validate_label_form, LabelPolicy};
