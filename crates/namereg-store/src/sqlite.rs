//! SQLite implementation of the EventStore trait.
//!
//! This is the primary journal backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use namereg_core::{decode_event, encode_event, Blake3Hash, Label};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AppendResult, EventStore, JournalEntry};

/// SQLite-based journal.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteEventStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEventStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{value} exceeds SQLite integer range")))
}

fn from_sql_int(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("negative value {value} in column {column}")))
}

fn digest_from_blob(blob: Vec<u8>) -> Result<Blake3Hash> {
    let bytes: [u8; 32] = blob
        .try_into()
        .map_err(|_| StoreError::InvalidData("digest is not 32 bytes".into()))?;
    Ok(Blake3Hash::from_bytes(bytes))
}

/// Raw column values for one row, converted outside the rusqlite closure.
struct EventRow {
    seq: i64,
    idx: i64,
    recorded_at: i64,
    body: Vec<u8>,
}

impl EventRow {
    const COLUMNS: &'static str = "seq, idx, recorded_at, body";

    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            seq: row.get(0)?,
            idx: row.get(1)?,
            recorded_at: row.get(2)?,
            body: row.get(3)?,
        })
    }

    fn into_entry(self) -> Result<JournalEntry> {
        let index = u32::try_from(self.idx)
            .map_err(|_| StoreError::InvalidData(format!("event index {} out of range", self.idx)))?;
        Ok(JournalEntry {
            seq: from_sql_int(self.seq, "seq")?,
            index,
            recorded_at: from_sql_int(self.recorded_at, "recorded_at")?,
            event: decode_event(&self.body)?,
        })
    }
}

/// Column values for one entry about to be inserted.
struct NewRow {
    seq: i64,
    idx: i64,
    recorded_at: i64,
    kind: i64,
    label: Option<String>,
    token_id: Option<i64>,
    digest: Blake3Hash,
    body: Vec<u8>,
}

impl NewRow {
    fn from_entry(entry: &JournalEntry) -> Result<Self> {
        let body = encode_event(&entry.event)?;
        Ok(Self {
            seq: to_sql_int(entry.seq)?,
            idx: i64::from(entry.index),
            recorded_at: to_sql_int(entry.recorded_at)?,
            kind: i64::from(entry.event.kind().to_u16()),
            label: entry.event.label().map(|l| l.as_str().to_owned()),
            token_id: entry
                .event
                .token_id()
                .map(|t| to_sql_int(t.0))
                .transpose()?,
            digest: Blake3Hash::hash(&body),
            body,
        })
    }
}

fn collect_rows(
    rows: impl Iterator<Item = rusqlite::Result<EventRow>>,
) -> Result<Vec<JournalEntry>> {
    rows.map(|row| row?.into_entry()).collect()
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn append_batch(&self, entries: &[JournalEntry]) -> Result<AppendResult> {
        let rows = entries
            .iter()
            .map(NewRow::from_entry)
            .collect::<Result<Vec<_>>>()?;

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let mut missing = Vec::new();
            for row in &rows {
                let existing: Option<(Vec<u8>, i64)> = tx
                    .query_row(
                        "SELECT digest, recorded_at FROM events WHERE seq = ?1 AND idx = ?2",
                        params![row.seq, row.idx],
                        |r| Ok((r.get(0)?, r.get(1)?)),
                    )
                    .optional()?;

                match existing {
                    Some((existing_digest, existing_at)) => {
                        let existing_digest = digest_from_blob(existing_digest)?;
                        if existing_digest != row.digest || existing_at != row.recorded_at {
                            return Ok(AppendResult::Conflict {
                                existing: existing_digest,
                            });
                        }
                    }
                    None => missing.push(row),
                }
            }
            if missing.is_empty() {
                return Ok(AppendResult::AlreadyExists);
            }

            for row in missing {
                tx.execute(
                    "INSERT INTO events (seq, idx, recorded_at, kind, label, token_id, digest, body)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        row.seq,
                        row.idx,
                        row.recorded_at,
                        row.kind,
                        row.label,
                        row.token_id,
                        row.digest.as_bytes().as_slice(),
                        row.body
                    ],
                )?;
            }
            tx.commit()?;
            Ok(AppendResult::Appended)
        })
        .await
    }

    async fn get(&self, seq: u64) -> Result<Vec<JournalEntry>> {
        let seq = to_sql_int(seq)?;
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM events WHERE seq = ?1 ORDER BY idx",
                EventRow::COLUMNS
            ))?;
            let rows = stmt.query_map(params![seq], EventRow::read)?;
            collect_rows(rows)
        })
        .await
    }

    async fn events_since(&self, after_seq: u64, limit: usize) -> Result<Vec<JournalEntry>> {
        // Anything past i64::MAX cannot have been stored.
        let Ok(after) = i64::try_from(after_seq) else {
            return Ok(Vec::new());
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM events WHERE seq > ?1 ORDER BY seq, idx LIMIT ?2",
                EventRow::COLUMNS
            ))?;
            let rows = stmt.query_map(params![after, limit], EventRow::read)?;
            collect_rows(rows)
        })
        .await
    }

    async fn events_for_label(&self, label: &Label) -> Result<Vec<JournalEntry>> {
        let label = label.as_str().to_owned();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM events WHERE label = ?1 ORDER BY seq, idx",
                EventRow::COLUMNS
            ))?;
            let rows = stmt.query_map(params![label], EventRow::read)?;
            collect_rows(rows)
        })
        .await
    }

    async fn latest_seq(&self) -> Result<u64> {
        self.blocking(|conn| {
            let latest: Option<i64> =
                conn.query_row("SELECT MAX(seq) FROM events", [], |row| row.get(0))?;
            latest.map_or(Ok(0), |seq| from_sql_int(seq, "seq"))
        })
        .await
    }

    async fn len(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
            from_sql_int(count, "count")
        })
        .await
    }
}
