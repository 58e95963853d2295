//! Registry events: the externally observable record of state changes.
//!
//! Every successful state-changing operation emits one or more events.
//! Failed operations emit nothing. Events carry only the minimal
//! identifying tuple an indexer needs.

use serde::{Deserialize, Serialize};

use crate::commitment::CommitmentHash;
use crate::crypto::Address;
use crate::types::{Amount, Label, Timestamp, TokenId};

/// Discriminator for event interpretation, stable across encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum EventKind {
    // Commit-reveal (0x0000 - 0x00FF)
    CommitmentSubmitted = 0x0001,

    // Name lifecycle (0x0100 - 0x01FF)
    Registered = 0x0100,
    Renewed = 0x0101,
    Transferred = 0x0102,
    Burned = 0x0103,

    // Name settings (0x0200 - 0x02FF)
    PrimarySet = 0x0200,
    ResolverChanged = 0x0201,

    // Treasury (0x0300 - 0x03FF)
    FeesWithdrawn = 0x0300,
}

impl EventKind {
    /// Convert to u16 for serialization.
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Try to parse from u16.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::CommitmentSubmitted),
            0x0100 => Some(Self::Registered),
            0x0101 => Some(Self::Renewed),
            0x0102 => Some(Self::Transferred),
            0x0103 => Some(Self::Burned),
            0x0200 => Some(Self::PrimarySet),
            0x0201 => Some(Self::ResolverChanged),
            0x0300 => Some(Self::FeesWithdrawn),
            _ => None,
        }
    }

    /// Check if this kind changes a name's lifecycle.
    pub fn is_lifecycle(self) -> bool {
        (self.to_u16() & 0xFF00) == 0x0100
    }
}

/// An event emitted by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A commitment was stored (or refreshed).
    CommitmentSubmitted {
        hash: CommitmentHash,
        at: Timestamp,
    },

    /// A label was registered and a fresh token minted.
    Registered {
        label: Label,
        holder: Address,
        token_id: TokenId,
        expires_at: Timestamp,
        cost: Amount,
    },

    /// A label's expiry was extended.
    Renewed {
        label: Label,
        token_id: TokenId,
        expires_at: Timestamp,
        cost: Amount,
    },

    /// A token changed holder.
    Transferred {
        label: Label,
        token_id: TokenId,
        from: Address,
        to: Address,
    },

    /// A lapsed name was cleared from the registry.
    Burned {
        label: Label,
        token_id: TokenId,
        at: Timestamp,
    },

    /// A holder chose a primary name.
    PrimarySet { holder: Address, label: Label },

    /// A name's resolver was set or cleared.
    ResolverChanged {
        label: Label,
        token_id: TokenId,
        resolver: Option<Address>,
    },

    /// Accumulated fees were paid out.
    FeesWithdrawn { recipient: Address, amount: Amount },
}

impl RegistryEvent {
    /// The discriminator for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            RegistryEvent::CommitmentSubmitted { .. } => EventKind::CommitmentSubmitted,
            RegistryEvent::Registered { .. } => EventKind::Registered,
            RegistryEvent::Renewed { .. } => EventKind::Renewed,
            RegistryEvent::Transferred { .. } => EventKind::Transferred,
            RegistryEvent::Burned { .. } => EventKind::Burned,
            RegistryEvent::PrimarySet { .. } => EventKind::PrimarySet,
            RegistryEvent::ResolverChanged { .. } => EventKind::ResolverChanged,
            RegistryEvent::FeesWithdrawn { .. } => EventKind::FeesWithdrawn,
        }
    }

    /// The label this event concerns, if any.
    pub fn label(&self) -> Option<&Label> {
        match self {
            RegistryEvent::Registered { label, .. }
            | RegistryEvent::Renewed { label, .. }
            | RegistryEvent::Transferred { label, .. }
            | RegistryEvent::Burned { label, .. }
            | RegistryEvent::PrimarySet { label, .. }
            | RegistryEvent::ResolverChanged { label, .. } => Some(label),
            RegistryEvent::CommitmentSubmitted { .. } | RegistryEvent::FeesWithdrawn { .. } => {
                None
            }
        }
    }

    /// The token this event concerns, if any.
    pub fn token_id(&self) -> Option<TokenId> {
        match self {
            RegistryEvent::Registered { token_id, .. }
            | RegistryEvent::Renewed { token_id, .. }
            | RegistryEvent::Transferred { token_id, .. }
            | RegistryEvent::Burned { token_id, .. }
            | RegistryEvent::ResolverChanged { token_id, .. } => Some(*token_id),
            _ => None,
        }
    }
}
