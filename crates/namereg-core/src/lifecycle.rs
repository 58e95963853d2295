//! Name lifecycle state.
//!
//! State is never stored. It is recomputed from `expires_at`, the grace
//! period and the current time on every read.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Lifecycle state of a registered name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameState {
    /// `now < expires_at`.
    Active,
    /// `expires_at <= now < expires_at + grace`. Only the holder may renew.
    Grace,
    /// `now >= expires_at + grace`. Anyone may burn or re-register.
    Burnable,
}

impl NameState {
    /// Compute the state at `now`.
    ///
    /// If `expires_at + grace` overflows the name can never become burnable.
    pub fn at(expires_at: Timestamp, grace: u64, now: Timestamp) -> Self {
        if now < expires_at {
            return NameState::Active;
        }
        match expires_at.checked_add(grace) {
            Some(burnable_at) if now >= burnable_at => NameState::Burnable,
            _ => NameState::Grace,
        }
    }

    /// Whether the name is past its expiry (grace or burnable).
    pub fn is_expired(self) -> bool {
        !matches!(self, NameState::Active)
    }

    pub fn is_active(self) -> bool {
        matches!(self, NameState::Active)
    }

    pub fn is_burnable(self) -> bool {
        matches!(self, NameState::Burnable)
    }
}
