//! Commitment store for the commit-reveal protocol.
//!
//! A commitment is an opaque hash recorded with the time it was submitted.
//! It can be redeemed once, inside the window
//! `[submitted_at + min_age, submitted_at + max_age]`.

use std::collections::HashMap;

use namereg_core::{CommitmentHash, Timestamp};

use crate::error::{RegistryError, Result};

/// Live commitments keyed by hash.
#[derive(Debug, Default, Clone)]
pub struct CommitmentStore {
    entries: HashMap<CommitmentHash, Timestamp>,
}

impl CommitmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash` at `now`, replacing any earlier submission.
    ///
    /// Returns the replaced submission time.
    pub fn submit(&mut self, hash: CommitmentHash, now: Timestamp) -> Option<Timestamp> {
        self.entries.insert(hash, now)
    }

    /// When `hash` was submitted, if it is live.
    pub fn submitted_at(&self, hash: &CommitmentHash) -> Option<Timestamp> {
        self.entries.get(hash).copied()
    }

    /// Check that `hash` can be redeemed at `now` without consuming it.
    pub fn check(
        &self,
        hash: &CommitmentHash,
        now: Timestamp,
        min_age: u64,
        max_age: u64,
    ) -> Result<()> {
        let submitted_at = self
            .submitted_at(hash)
            .ok_or(RegistryError::NoCommitment(*hash))?;

        // Saturation keeps a commitment submitted near the end of the clock
        // from wrapping into a usable window.
        let usable_at = submitted_at.saturating_add(min_age);
        if now < usable_at {
            return Err(RegistryError::TooFresh {
                hash: *hash,
                usable_at,
            });
        }
        let expired_at = submitted_at.saturating_add(max_age);
        if now > expired_at {
            return Err(RegistryError::CommitmentExpired {
                hash: *hash,
                expired_at,
            });
        }
        Ok(())
    }

    /// Delete `hash`, returning its submission time.
    pub fn remove(&mut self, hash: &CommitmentHash) -> Option<Timestamp> {
        self.entries.remove(hash)
    }

    /// Put back an entry exactly as it was before a rolled-back operation.
    pub(crate) fn restore(&mut self, hash: CommitmentHash, submitted_at: Option<Timestamp>) {
        match submitted_at {
            Some(at) => {
                self.entries.insert(hash, at);
            }
            None => {
                self.entries.remove(&hash);
            }
        }
    }

    /// Drop every commitment that can no longer be redeemed at `now`.
    pub fn prune(&mut self, now: Timestamp, max_age: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, submitted_at| now <= submitted_at.saturating_add(max_age));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
