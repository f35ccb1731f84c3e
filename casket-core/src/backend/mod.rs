//! Transactional storage backends.
//!
//! The store engine only needs serializable read and read/write transactions
//! over named partitions. [`SqliteBackend`] is the durable implementation and
//! [`MemoryBackend`] a volatile one with the same transaction semantics.
//!
//! Both serialize writers globally, whatever partition they touch. Keyspace
//! segmentation therefore spreads coalescing and read contention but does not
//! add write parallelism.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Handle to a named partition.
///
/// Handles are minted inside this crate only; whoever holds one is the only
/// code path able to address that partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    name: Arc<str>,
}

impl Partition {
    pub(crate) fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub trait ReadTxn {
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

pub trait WriteTxn: ReadTxn {
    fn put(&mut self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()>;
}

/// A storage engine offering atomic, serializable transactions.
///
/// A closure returning `Err` aborts its transaction; nothing it wrote becomes
/// visible and the error is handed back unchanged.
pub trait Backend: Send + Sync + 'static {
    fn ensure_partition(&self, partition: &Partition) -> Result<()>;

    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>;

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => f.write_str("sqlite"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Backend chosen at startup from configuration.
pub enum StorageBackend {
    Sqlite(SqliteBackend),
    Memory(MemoryBackend),
}

impl StorageBackend {
    pub fn open(kind: BackendKind, db_path: &Path) -> Result<Self> {
        match kind {
            BackendKind::Sqlite => Ok(Self::Sqlite(SqliteBackend::open(db_path)?)),
            BackendKind::Memory => Ok(Self::Memory(MemoryBackend::new())),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Sqlite(_) => BackendKind::Sqlite,
            Self::Memory(_) => BackendKind::Memory,
        }
    }
}

impl Backend for StorageBackend {
    fn ensure_partition(&self, partition: &Partition) -> Result<()> {
        match self {
            Self::Sqlite(backend) => backend.ensure_partition(partition),
            Self::Memory(backend) => backend.ensure_partition(partition),
        }
    }

    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>,
    {
        match self {
            Self::Sqlite(backend) => backend.view(f),
            Self::Memory(backend) => backend.view(f),
        }
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T>,
    {
        match self {
            Self::Sqlite(backend) => backend.update(f),
            Self::Memory(backend) => backend.update(f),
        }
    }
}

pub(crate) fn unknown_partition(partition: &Partition) -> StoreError {
    StoreError::Backend(format!("unknown partition: {}", partition))
}
