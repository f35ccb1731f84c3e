use crate::backend::{Backend, Partition};
use crate::coalesce::Coalescer;
use crate::error::{Result, StoreError};
use crate::key::Key;
use bytes::Bytes;

pub const DEFAULT_SEGMENTS: usize = 8;
pub const MAX_SEGMENTS: usize = 256;

/// Map a key to its keyspace segment.
///
/// Only the leading byte of the key is consulted, masked to the low
/// `log2(segment_count)` bits. The assignment is recomputed on every call and
/// never persisted, so it stays stable across restarts for a fixed count.
/// `segment_count` must already have passed [`validate_segment_count`].
pub(crate) fn segment_for(key: &Key, segment_count: usize) -> usize {
    (key.as_bytes()[0] as usize) & (segment_count - 1)
}

pub fn validate_segment_count(segment_count: usize) -> Result<()> {
    if segment_count == 0 || segment_count > MAX_SEGMENTS || !segment_count.is_power_of_two() {
        return Err(StoreError::Config(format!(
            "segment count must be a power of two in [1, {}], got {}",
            MAX_SEGMENTS, segment_count
        )));
    }
    Ok(())
}

/// Per-segment partitions and coalescing groups.
///
/// Puts and reads use separate groups so a slow write never makes readers of
/// the same key wait on it.
pub struct Segments {
    partitions: Vec<Partition>,
    put_groups: Vec<Coalescer<Key>>,
    read_groups: Vec<Coalescer<Bytes>>,
}

impl Segments {
    pub fn open<B: Backend>(backend: &B, segment_count: usize) -> Result<Self> {
        validate_segment_count(segment_count)?;

        let mut partitions = Vec::with_capacity(segment_count);
        for segment in 0..segment_count {
            let partition = Partition::new(format!("bucket-{}", segment));
            backend.ensure_partition(&partition)?;
            partitions.push(partition);
        }

        Ok(Self {
            partitions,
            put_groups: (0..segment_count).map(|_| Coalescer::new()).collect(),
            read_groups: (0..segment_count).map(|_| Coalescer::new()).collect(),
        })
    }

    pub fn count(&self) -> usize {
        self.partitions.len()
    }

    pub fn segment_for(&self, key: &Key) -> usize {
        segment_for(key, self.count())
    }

    pub fn partition(&self, segment: usize) -> &Partition {
        &self.partitions[segment]
    }

    pub fn put_group(&self, segment: usize) -> &Coalescer<Key> {
        &self.put_groups[segment]
    }

    pub fn read_group(&self, segment: usize) -> &Coalescer<Bytes> {
        &self.read_groups[segment]
    }
}
