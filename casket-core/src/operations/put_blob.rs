use crate::backend::Backend;
use crate::error::{Result, StoreError};
use crate::key::Key;
use crate::ledger::MetadataLedger;
use crate::segment::Segments;
use bytes::Bytes;
use std::sync::Arc;

pub struct PutBlobOperation<B> {
    backend: Arc<B>,
    segments: Arc<Segments>,
    ledger: Arc<MetadataLedger<B>>,
}

#[derive(Debug, Clone)]
pub struct PutBlobOperationRequest {
    /// `None` when the caller supplied no value at all.
    pub value: Option<Bytes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutBlobOperationResult {
    pub key: Key,
    pub segment: usize,
    pub size_bytes: u64,
}

impl<B: Backend> PutBlobOperation<B> {
    pub fn new(
        backend: Arc<B>,
        segments: Arc<Segments>,
        ledger: Arc<MetadataLedger<B>>,
    ) -> Self {
        Self {
            backend,
            segments,
            ledger,
        }
    }

    /// Store a value under its content key.
    ///
    /// Concurrent puts of identical content share one leader: it checks for
    /// an existing entry, writes the value, then accounts for it in the
    /// ledger. Every follower receives the leader's outcome, and the unit of
    /// work runs to completion even if the caller that started it goes away.
    /// The blob write and the ledger update are separate transactions, so a
    /// crash between them leaves the counters one object behind the data.
    pub async fn run(&self, request: PutBlobOperationRequest) -> Result<PutBlobOperationResult> {
        let value = request.value.ok_or(StoreError::NilValue)?;
        if value.is_empty() {
            return Err(StoreError::ZeroValue);
        }

        let key = Key::derive(&value);
        let segment = self.segments.segment_for(&key);
        let size_bytes = value.len() as u64;

        let backend = self.backend.clone();
        let partition = self.segments.partition(segment).clone();
        let ledger = self.ledger.clone();

        let key = self
            .segments
            .put_group(segment)
            .execute(&key.to_hex(), || async move {
                tokio::task::spawn_blocking(move || {
                    backend.update(|txn| {
                        if txn.get(&partition, key.as_bytes())?.is_some() {
                            return Err(StoreError::Existing);
                        }
                        txn.put(&partition, key.as_bytes(), &value)
                    })
                })
                .await??;

                ledger.record_put(size_bytes).await?;
                tracing::debug!(
                    "Stored blob {} in segment {} ({} bytes)",
                    key,
                    segment,
                    size_bytes
                );
                Ok(key)
            })
            .await?;

        Ok(PutBlobOperationResult {
            key,
            segment,
            size_bytes,
        })
    }
}
