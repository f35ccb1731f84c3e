//! Aggregate metadata: how many objects the store holds and how many bytes.
//!
//! The counters live in their own `meta` partition as fixed-width
//! little-endian values. The partition handle never leaves this module, so
//! [`MetadataLedger`] is the only writer of the counters.

use crate::backend::{Backend, Partition, ReadTxn};
use crate::coalesce::Coalescer;
use crate::error::{Result, StoreError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

const META_PARTITION: &str = "meta";
const OBJECT_COUNT_KEY: &[u8] = b"object-cnt";
const TOTAL_SIZE_KEY: &[u8] = b"totsize";
const INFO_KEY: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub object_count: u32,
    pub total_bytes: u64,
}

impl fmt::Display for LedgerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "object-cnt:{} - totsize:{}",
            self.object_count, self.total_bytes
        )
    }
}

pub struct MetadataLedger<B> {
    backend: Arc<B>,
    partition: Partition,
    // every ledger transaction runs while holding this
    gate: Arc<Mutex<()>>,
    readers: Coalescer<LedgerStats>,
}

impl<B: Backend> MetadataLedger<B> {
    /// Create the partition and seed zeroed counters if they are missing.
    pub fn open(backend: Arc<B>) -> Result<Self> {
        let partition = Partition::new(META_PARTITION);
        backend.ensure_partition(&partition)?;

        backend.update(|txn| {
            if txn.get(&partition, OBJECT_COUNT_KEY)?.is_none() {
                txn.put(&partition, OBJECT_COUNT_KEY, &0u32.to_le_bytes())?;
            }
            if txn.get(&partition, TOTAL_SIZE_KEY)?.is_none() {
                txn.put(&partition, TOTAL_SIZE_KEY, &0u64.to_le_bytes())?;
            }
            Ok(())
        })?;

        Ok(Self {
            backend,
            partition,
            gate: Arc::new(Mutex::new(())),
            readers: Coalescer::new(),
        })
    }

    /// Account for one newly stored object of `size` bytes.
    ///
    /// Concurrent calls queue on the gate and each applies its own delta;
    /// they are never merged into one another.
    pub async fn record_put(&self, size: u64) -> Result<LedgerStats> {
        let _gate = self.gate.lock().await;
        let backend = self.backend.clone();
        let partition = self.partition.clone();

        let stats = tokio::task::spawn_blocking(move || {
            backend.update(|txn| {
                let current = read_stats(&*txn, &partition)?;
                let next = advance(current, size);
                txn.put(&partition, OBJECT_COUNT_KEY, &next.object_count.to_le_bytes())?;
                txn.put(&partition, TOTAL_SIZE_KEY, &next.total_bytes.to_le_bytes())?;
                Ok(next)
            })
        })
        .await??;

        tracing::debug!("ledger updated: {}", stats);
        Ok(stats)
    }

    /// Read the counters without modifying them.
    pub async fn snapshot(&self) -> Result<LedgerStats> {
        let gate = self.gate.clone();
        let backend = self.backend.clone();
        let partition = self.partition.clone();

        self.readers
            .execute(INFO_KEY, || async move {
                let _gate = gate.lock().await;
                tokio::task::spawn_blocking(move || {
                    backend.view(|txn| read_stats(txn, &partition))
                })
                .await?
            })
            .await
    }
}

fn advance(current: LedgerStats, size: u64) -> LedgerStats {
    let object_count = current.object_count.checked_add(1).unwrap_or_else(|| {
        tracing::warn!(
            "object count saturated at {}, further objects are not counted",
            u32::MAX
        );
        u32::MAX
    });
    let total_bytes = current.total_bytes.checked_add(size).unwrap_or_else(|| {
        tracing::warn!("total size saturated at {} bytes", u64::MAX);
        u64::MAX
    });
    LedgerStats {
        object_count,
        total_bytes,
    }
}

fn read_stats<T: ReadTxn + ?Sized>(txn: &T, partition: &Partition) -> Result<LedgerStats> {
    let object_count = match txn.get(partition, OBJECT_COUNT_KEY)? {
        Some(raw) => u32::from_le_bytes(fixed_width(&raw)?),
        None => 0,
    };
    let total_bytes = match txn.get(partition, TOTAL_SIZE_KEY)? {
        Some(raw) => u64::from_le_bytes(fixed_width(&raw)?),
        None => 0,
    };
    Ok(LedgerStats {
        object_count,
        total_bytes,
    })
}

fn fixed_width<const N: usize>(raw: &[u8]) -> Result<[u8; N]> {
    raw.try_into().map_err(|_| StoreError::DataCorrupted)
}
