//! # Name Registry
//!
//! A registry of human-readable names with commit-reveal registration,
//! expiry, a grace period, permissionless burn, and a primary-name index.
//!
//! ## Overview
//!
//! - **Commit-reveal**: a registrant first publishes `H(label, caller, secret)`
//!   and reveals it only after a minimum age, so an observer of the pending
//!   registration cannot claim the label first.
//! - **Lifecycle**: a name is `Active` until expiry, then in `Grace` (only its
//!   holder may renew), then `Burnable` (anyone may burn or re-register it).
//!   The state is recomputed from the clock on every read.
//! - **Indices**: ownership (`label <-> token`, `holder -> labels`) and the
//!   reverse primary-name pointer change together with every transfer.
//! - **Payments**: fees stay in the registry treasury. Excess is refunded
//!   through a [`Payout`] after all bookkeeping is done; a failed refund rolls
//!   the whole operation back.
//!
//! ## Usage
//!
//! ```rust
//! use namereg::{CallContext, LedgerPayout, Registry};
//! use namereg::allowance::NoAllowance;
//! use namereg::core::{CommitmentHash, Keypair, Label, RegistryConfig, Secret};
//!
//! let admin = Keypair::from_seed(&[1; 32]).address();
//! let alice = Keypair::from_seed(&[2; 32]).address();
//! let config = RegistryConfig::default();
//! let mut registry =
//!     Registry::new(config.clone(), admin, NoAllowance, LedgerPayout::new()).unwrap();
//!
//! let label = Label::parse("alice").unwrap();
//! let secret = Secret::from_bytes([7; 32]);
//! let hash = CommitmentHash::derive(&label, &alice, &secret);
//! registry.commit(&CallContext::new(alice, 1_000), hash).unwrap();
//!
//! let fee = registry.quote("alice", 1).unwrap();
//! let ctx = CallContext::new(alice, 1_000 + config.min_commitment_age)
//!     .with_value(fee)
//!     .with_sequence(1);
//! registry.register(&ctx, "alice", 1, &secret, None).unwrap();
//!
//! assert_eq!(registry.owner_of(&label, ctx.now), Some(alice));
//! ```
//!
//! ## Re-exports
//!
//! - `namereg::core` - Core primitives (Label, CommitmentHash, RegistryConfig, ...)
//! - `namereg::store` - Event journal and SQLite backend
//! - `namereg::allowance` - Fee-waiver allowances

pub mod clock;
pub mod commitments;
pub mod error;
pub mod ownership;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod reverse;
pub mod service;
pub mod treasury;

pub use namereg_allowance as allowance;
pub use namereg_core as core;
pub use namereg_store as store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, RegistryError, Result};
pub use record::NameRecord;
pub use registry::{CallContext, Registry};
pub use resolver::{may_write_records, RegistryView};
pub use service::{RegistryService, ServiceConfig};
pub use treasury::{LedgerPayout, Payout, PayoutError};

pub use namereg_core::{
    Address, Amount, CommitmentHash, Keypair, Label, NameState, RegistryConfig, RegistryEvent,
    Secret, Timestamp, TokenId,
};
