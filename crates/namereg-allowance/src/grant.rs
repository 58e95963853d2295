//! Grant and Revoke payloads.
//!
//! A Grant gives a recipient a number of fee-waiver units. A Revoke
//! withdraws a previous grant.

use serde::{Deserialize, Serialize};
use std::fmt;

use namereg_core::{Address, Timestamp};

use crate::error::{AllowanceError, Result};

/// Domain separator for grant ids.
const GRANT_DOMAIN: &[u8] = b"namereg-grant-v0:";

/// Identifier of an issued grant.
///
/// Derived from Blake3(grantor || recipient || issue nonce).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(pub [u8; 32]);

impl GrantId {
    /// Derive a grant id.
    pub fn derive(grantor: &Address, recipient: &Address, nonce: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(GRANT_DOMAIN);
        hasher.update(grantor.as_bytes());
        hasher.update(recipient.as_bytes());
        hasher.update(&nonce.to_be_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GrantId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Payload for a Grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantPayload {
    /// The account receiving waiver units.
    pub recipient: Address,

    /// How many registrations this grant can waive.
    pub units: u32,

    /// Optional validity window.
    pub conditions: Option<Conditions>,
}

/// Payload for a Revoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokePayload {
    /// The grant being revoked.
    pub grant_id: GrantId,

    /// Optional reason for revocation.
    pub reason: Option<String>,
}

/// Conditions that may limit a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// Grant is unusable before this time.
    pub not_before: Option<Timestamp>,

    /// Grant is unusable after this time.
    pub expires_at: Option<Timestamp>,
}

impl Conditions {
    /// Create conditions with an expiration time.
    pub fn expires_at(timestamp: Timestamp) -> Self {
        Self {
            not_before: None,
            expires_at: Some(timestamp),
        }
    }

    /// Create conditions with a start time.
    pub fn not_before(timestamp: Timestamp) -> Self {
        Self {
            not_before: Some(timestamp),
            expires_at: None,
        }
    }

    /// Check if these conditions hold at `now`.
    pub fn is_valid(&self, now: Timestamp) -> bool {
        if let Some(start) = self.not_before {
            if now < start {
                return false;
            }
        }
        if let Some(expires) = self.expires_at {
            if now > expires {
                return false;
            }
        }
        true
    }
}

impl GrantPayload {
    /// A grant of `units` waivers with no conditions.
    pub fn new(recipient: Address, units: u32) -> Self {
        Self {
            recipient,
            units,
            conditions: None,
        }
    }

    /// Add conditions to this grant.
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| AllowanceError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| AllowanceError::InvalidGrant(e.to_string()))
    }
}

impl RevokePayload {
    /// Create a new revoke payload.
    pub fn new(grant_id: GrantId) -> Self {
        Self {
            grant_id,
            reason: None,
        }
    }

    /// Add a reason for the revocation.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| AllowanceError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| AllowanceError::InvalidGrant(e.to_string()))
    }
}
