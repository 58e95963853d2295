//! # Name Registry Store
//!
//! Durable, append-only journal of registry events. Provides a trait-based
//! interface with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! Events are the only durable API surface the registry offers external
//! indexers. The journal assigns every accepted event a sequence number
//! and never rewrites history.
//!
//! ## Key Types
//!
//! - [`EventStore`] - The async trait for all journal operations
//! - [`SqliteEventStore`] - SQLite-based persistent journal
//! - [`MemoryEventStore`] - In-memory journal for tests
//! - [`JournalEntry`] - A sequenced, timestamped event
//! - [`AppendResult`] - Result of appending an entry
//!
//! ## Usage
//!
//! ```rust,no_run
//! use namereg_store::{EventStore, JournalEntry, SqliteEventStore};
//!
//! async fn example() {
//!     // Open a SQLite journal
//!     let store = SqliteEventStore::open("registry.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteEventStore::open_memory().unwrap();
//!
//!     let latest = store.latest_seq().await.unwrap();
//!     let tail = store.events_since(latest.saturating_sub(10), 10).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent appends**: appending an identical entry twice returns `AlreadyExists`
//! - **Conflict detection**: a different event at an existing sequence returns `Conflict`
//! - **Label index**: every event that names a label can be queried by label

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryEventStore;
pub use sqlite::SqliteEventStore;
pub use traits::{AppendResult, EventStore, EventStoreExt, JournalEntry};
