//! # Name Registry Allowances
//!
//! Fee-waiver entitlements for the name registry.
//!
//! ## Overview
//!
//! An allowance administrator issues grants to recipients. Each grant holds
//! a number of waiver units and optional conditions (a validity window).
//! During registration the registry asks [`Allowance::can_waive`] whether a
//! caller holds any unit, and only after the registration has been fully
//! recorded calls [`Allowance::consume`] to spend one.
//!
//! ## Key Concepts
//!
//! - **Grant**: units of fee waiver issued to one recipient
//! - **Revoke**: withdraws a grant; revoked grants contribute nothing
//! - **Conditions**: a `not_before` / `expires_at` window on a grant
//!
//! The allowance service never calls into the registry. It only answers
//! questions and records consumption.
//!
//! ## Usage
//!
//! ```rust
//! use namereg_allowance::{Allowance, AllowanceLedger, GrantPayload};
//! use namereg_core::{Keypair, Label};
//!
//! let admin = Keypair::from_seed(&[1; 32]).address();
//! let user = Keypair::from_seed(&[2; 32]).address();
//!
//! let mut ledger = AllowanceLedger::new(admin);
//! ledger.issue(&admin, GrantPayload::new(user, 2), 0).unwrap();
//!
//! assert_eq!(ledger.can_waive(&user, 0), (true, 2));
//! ledger.consume(&user, &Label::parse("alice").unwrap(), 0).unwrap();
//! assert_eq!(ledger.can_waive(&user, 0), (true, 1));
//! ```

pub mod error;
pub mod grant;
pub mod state;

pub use error::{AllowanceError, Result};
pub use grant::{Conditions, GrantId, GrantPayload, RevokePayload};
pub use state::{AllowanceLedger, GrantState};

use namereg_core::{Address, Label, Timestamp};

/// The allowance boundary the registry consumes.
///
/// Implementations must not call back into the registry.
pub trait Allowance {
    /// Whether `caller` can have a fee waived right now, and how many units
    /// they hold in total.
    fn can_waive(&self, caller: &Address, now: Timestamp) -> (bool, u32);

    /// Spend one unit for `caller` on `label`, returning the grant it came from.
    fn consume(&mut self, caller: &Address, label: &Label, now: Timestamp) -> Result<GrantId>;

    /// Return the unit `consume` spent from `grant` on `label`.
    ///
    /// Only called when the registration that consumed it is rolled back.
    fn release(&mut self, caller: &Address, grant: &GrantId, label: &Label) -> Result<()>;
}

/// An allowance service that never waives anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAllowance;

impl Allowance for NoAllowance {
    fn can_waive(&self, _caller: &Address, _now: Timestamp) -> (bool, u32) {
        (false, 0)
    }

    fn consume(&mut self, caller: &Address, _label: &Label, _now: Timestamp) -> Result<GrantId> {
        Err(AllowanceError::NoAllowance(caller.to_string()))
    }

    fn release(&mut self, caller: &Address, _grant: &GrantId, _label: &Label) -> Result<()> {
        Err(AllowanceError::NoAllowance(caller.to_string()))
    }
}
