//! Name records.

use namereg_core::{Address, Label, NameState, Timestamp, TokenId};
use serde::{Deserialize, Serialize};

/// The registry's record for one label.
///
/// A record exists from registration until burn or re-registration. Its
/// holder is only meaningful while the record is not burnable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub label: Label,
    pub holder: Address,
    pub token_id: TokenId,
    pub registered_at: Timestamp,
    pub expires_at: Timestamp,
    pub resolver: Option<Address>,
}

impl NameRecord {
    /// Lifecycle state at `now`.
    pub fn state(&self, grace: u64, now: Timestamp) -> NameState {
        NameState::at(self.expires_at, grace, now)
    }

    /// First instant the record can be burned, or `None` if never.
    pub fn burnable_at(&self, grace: u64) -> Option<Timestamp> {
        self.expires_at.checked_add(grace)
    }
}
