use super::{Backend, Partition, ReadTxn, WriteTxn, unknown_partition};
use crate::error::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

type Partitions = HashMap<String, BTreeMap<Vec<u8>, Vec<u8>>>;

/// Volatile backend keeping every partition in memory.
///
/// Writers hold the write lock for the whole transaction and stage their
/// puts, which are applied only when the closure succeeds.
#[derive(Default)]
pub struct MemoryBackend {
    partitions: RwLock<Partitions>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemoryReadTxn<'a> {
    partitions: &'a Partitions,
}

impl ReadTxn for MemoryReadTxn<'_> {
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let entries = self
            .partitions
            .get(partition.name())
            .ok_or_else(|| unknown_partition(partition))?;
        Ok(entries.get(key).cloned())
    }
}

struct MemoryWriteTxn<'a> {
    partitions: &'a Partitions,
    staged: Vec<(String, Vec<u8>, Vec<u8>)>,
}

impl ReadTxn for MemoryWriteTxn<'_> {
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let staged = self
            .staged
            .iter()
            .rev()
            .find(|(name, staged_key, _)| name == partition.name() && staged_key == key);
        if let Some((_, _, value)) = staged {
            return Ok(Some(value.clone()));
        }
        MemoryReadTxn {
            partitions: self.partitions,
        }
        .get(partition, key)
    }
}

impl WriteTxn for MemoryWriteTxn<'_> {
    fn put(&mut self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()> {
        if !self.partitions.contains_key(partition.name()) {
            return Err(unknown_partition(partition));
        }
        self.staged
            .push((partition.name().to_string(), key.to_vec(), value.to_vec()));
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn ensure_partition(&self, partition: &Partition) -> Result<()> {
        self.partitions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(partition.name().to_string())
            .or_default();
        Ok(())
    }

    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>,
    {
        let partitions = self.partitions.read().unwrap_or_else(PoisonError::into_inner);
        f(&MemoryReadTxn {
            partitions: &partitions,
        })
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T>,
    {
        let mut partitions = self
            .partitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let mut txn = MemoryWriteTxn {
            partitions: &partitions,
            staged: Vec::new(),
        };
        let out = f(&mut txn)?;
        let staged = txn.staged;

        for (name, key, value) in staged {
            if let Some(entries) = partitions.get_mut(&name) {
                entries.insert(key, value);
            }
        }
        Ok(out)
    }
}
