//! In-memory implementation of the EventStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use namereg_core::{Blake3Hash, Label};

use crate::error::{Result, StoreError};
use crate::traits::{AppendResult, EventStore, JournalEntry};

/// In-memory journal.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryEventStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Entries keyed by position.
    entries: BTreeMap<(u64, u32), Stored>,

    /// Label index: label -> positions, in append order.
    by_label: HashMap<Label, Vec<(u64, u32)>>,
}

struct Stored {
    entry: JournalEntry,
    digest: Blake3Hash,
}

impl MemoryEventStore {
    /// Create a new empty in-memory journal.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append_batch(&self, entries: &[JournalEntry]) -> Result<AppendResult> {
        let digests = entries
            .iter()
            .map(JournalEntry::digest)
            .collect::<Result<Vec<_>>>()?;
        let mut inner = self.write()?;

        let mut missing = Vec::new();
        for (entry, digest) in entries.iter().zip(digests) {
            match inner.entries.get(&(entry.seq, entry.index)) {
                Some(existing)
                    if existing.digest == digest
                        && existing.entry.recorded_at == entry.recorded_at => {}
                Some(existing) => {
                    return Ok(AppendResult::Conflict {
                        existing: existing.digest,
                    })
                }
                None => missing.push((entry, digest)),
            }
        }
        if missing.is_empty() {
            return Ok(AppendResult::AlreadyExists);
        }

        for (entry, digest) in missing {
            let position = (entry.seq, entry.index);
            if let Some(label) = entry.event.label() {
                inner
                    .by_label
                    .entry(label.clone())
                    .or_default()
                    .push(position);
            }
            inner.entries.insert(
                position,
                Stored {
                    entry: entry.clone(),
                    digest,
                },
            );
        }
        Ok(AppendResult::Appended)
    }

    async fn get(&self, seq: u64) -> Result<Vec<JournalEntry>> {
        let inner = self.read()?;
        Ok(inner
            .entries
            .range((seq, 0)..=(seq, u32::MAX))
            .map(|(_, stored)| stored.entry.clone())
            .collect())
    }

    async fn events_since(&self, after_seq: u64, limit: usize) -> Result<Vec<JournalEntry>> {
        let Some(start) = after_seq.checked_add(1) else {
            return Ok(Vec::new());
        };
        let inner = self.read()?;
        Ok(inner
            .entries
            .range((start, 0)..)
            .take(limit)
            .map(|(_, stored)| stored.entry.clone())
            .collect())
    }

    async fn events_for_label(&self, label: &Label) -> Result<Vec<JournalEntry>> {
        let inner = self.read()?;
        let mut positions = inner.by_label.get(label).cloned().unwrap_or_default();
        positions.sort_unstable();
        Ok(positions
            .iter()
            .filter_map(|pos| inner.entries.get(pos))
            .map(|stored| stored.entry.clone())
            .collect())
    }

    async fn latest_seq(&self) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner
            .entries
            .last_key_value()
            .map(|((seq, _), _)| *seq)
            .unwrap_or(0))
    }

    async fn len(&self) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.entries.len() as u64)
    }
}
