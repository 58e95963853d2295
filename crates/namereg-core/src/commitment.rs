//! Commit-reveal hashes.
//!
//! A claimant first publishes `H(label, claimant, secret)` and only reveals
//! the label and secret once the commitment has aged. Observers of the
//! commitment learn nothing about the label it targets.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Address;
use crate::types::Label;

/// Domain separator for commitment hashes.
const COMMIT_DOMAIN: &[u8] = b"namereg-commit-v0:";

/// A 32-byte secret chosen by the claimant.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret(pub [u8; 32]);

impl Secret {
    /// Draw a fresh random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// The opaque commitment `H(label, claimant, secret)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitmentHash(pub [u8; 32]);

impl CommitmentHash {
    /// Derive the commitment for a label, claimant and secret.
    ///
    /// The label is length-prefixed so that no two distinct
    /// `(label, claimant)` pairs share an encoding.
    pub fn derive(label: &Label, claimant: &Address, secret: &Secret) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(COMMIT_DOMAIN);
        hasher.update(&(label.as_str().len() as u32).to_be_bytes());
        hasher.update(label.as_str().as_bytes());
        hasher.update(claimant.as_bytes());
        hasher.update(&secret.0);
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}
