//! EventStore trait: the abstract interface for journal persistence.
//!
//! This trait keeps the registry service storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use namereg_core::{encode_event, Blake3Hash, Label, RegistryEvent, Timestamp};

use crate::error::Result;

/// A journaled event with its position and acceptance time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Operation sequence number that produced this event.
    pub seq: u64,
    /// Index of the event within its operation (operations may emit several).
    pub index: u32,
    /// Time the operation was accepted.
    pub recorded_at: Timestamp,
    /// The event itself.
    pub event: RegistryEvent,
}

impl JournalEntry {
    /// Create an entry.
    pub fn new(seq: u64, index: u32, recorded_at: Timestamp, event: RegistryEvent) -> Self {
        Self {
            seq,
            index,
            recorded_at,
            event,
        }
    }

    /// Blake3 digest of the canonical event encoding.
    pub fn digest(&self) -> Result<Blake3Hash> {
        Ok(Blake3Hash::hash(&encode_event(&self.event)?))
    }
}

/// Result of appending an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendResult {
    /// Entry was appended.
    Appended,
    /// The identical event is already journaled at this position.
    AlreadyExists,
    /// A different event occupies this position.
    Conflict {
        /// Digest of the event already stored there.
        existing: Blake3Hash,
    },
}

/// The EventStore trait: async interface for the event journal.
///
/// A position is the pair `(seq, index)`. The journal is append-only:
/// nothing is ever rewritten or removed.
///
/// # Design Notes
///
/// - **Idempotent appends**: appending the same entry twice returns `AlreadyExists`.
/// - **Conflict detection**: appending a different event at an occupied position
///   returns `Conflict` with the digest of the stored event.
/// - **Ordering**: every query returns entries ordered by `(seq, index)`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one entry to the journal.
    async fn append(&self, entry: &JournalEntry) -> Result<AppendResult> {
        self.append_batch(std::slice::from_ref(entry)).await
    }

    /// Append the entries of one operation atomically.
    ///
    /// Every position is checked before anything is written. If any is
    /// occupied by a different event the batch returns `Conflict` and writes
    /// nothing. If every entry is already stored it returns `AlreadyExists`.
    /// Otherwise the missing entries are written together.
    async fn append_batch(&self, entries: &[JournalEntry]) -> Result<AppendResult>;

    /// Get the entries produced by a single operation.
    async fn get(&self, seq: u64) -> Result<Vec<JournalEntry>>;

    /// Entries with `seq > after_seq`, at most `limit` of them.
    async fn events_since(&self, after_seq: u64, limit: usize) -> Result<Vec<JournalEntry>>;

    /// Every entry whose event names `label`.
    async fn events_for_label(&self, label: &Label) -> Result<Vec<JournalEntry>>;

    /// Highest journaled operation sequence number, or 0 when empty.
    async fn latest_seq(&self) -> Result<u64>;

    /// Total number of journaled entries.
    async fn len(&self) -> Result<u64>;
}

/// Extension trait for common journal patterns.
pub trait EventStoreExt: EventStore {
    /// Append every event of one operation, numbering them from 0, as a
    /// single batch.
    fn append_all(
        &self,
        seq: u64,
        recorded_at: Timestamp,
        events: &[RegistryEvent],
    ) -> impl std::future::Future<Output = Result<AppendResult>> + Send;
}

impl<S: EventStore + ?Sized> EventStoreExt for S {
    async fn append_all(
        &self,
        seq: u64,
        recorded_at: Timestamp,
        events: &[RegistryEvent],
    ) -> Result<AppendResult> {
        let entries = events
            .iter()
            .enumerate()
            .map(|(index, event)| {
                let index = u32::try_from(index).unwrap_or(u32::MAX);
                JournalEntry::new(seq, index, recorded_at, event.clone())
            })
            .collect::<Vec<_>>();
        if entries.is_empty() {
            return Ok(AppendResult::Appended);
        }
        self.append_batch(&entries).await
    }
}
