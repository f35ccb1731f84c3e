//! Casket Core - content-addressed blob storage
//!
//! Values are stored under the SHA-1 digest of their bytes:
//! - keyspace split into a fixed number of segments by the key's first byte
//! - concurrent identical operations coalesced into one unit of work
//! - SQLite (or memory) transactional backend, one partition per segment
//! - aggregate object count and byte total kept in a metadata ledger

pub mod backend;
pub mod client;
pub mod coalesce;
pub mod error;
pub mod key;
pub mod ledger;
pub mod operations;
pub mod segment;
pub mod store;

pub use backend::{
    Backend, BackendKind, MemoryBackend, Partition, ReadTxn, SqliteBackend, StorageBackend,
    WriteTxn,
};
pub use client::{CasketClient, DEFAULT_PORT};
pub use coalesce::Coalescer;
pub use error::{Result, StoreError};
pub use key::{KEY_SIZE, Key};
pub use ledger::{LedgerStats, MetadataLedger};
pub use operations::*;
pub use segment::{DEFAULT_SEGMENTS, MAX_SEGMENTS, Segments, validate_segment_count};
pub use store::{BlobStore, StoreOptions};
