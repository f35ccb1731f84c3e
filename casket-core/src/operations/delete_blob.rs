use crate::backend::Backend;
use crate::error::{Result, StoreError};
use crate::key::Key;
use crate::segment::Segments;
use bytes::Bytes;
use std::sync::Arc;

pub struct DeleteBlobOperation<B> {
    backend: Arc<B>,
    segments: Arc<Segments>,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteBlobOperationRequest {
    pub key: Key,
}

impl<B: Backend> DeleteBlobOperation<B> {
    pub fn new(backend: Arc<B>, segments: Arc<Segments>) -> Self {
        Self { backend, segments }
    }

    /// Resolve a delete request.
    ///
    /// Shares the segment's read group with gets under a distinct operation
    /// key. A missing key is `NotFound`; an existing one reports
    /// `NotImplemented` and is left in place, as are the ledger counters.
    pub async fn run(&self, request: DeleteBlobOperationRequest) -> Result<Bytes> {
        let DeleteBlobOperationRequest { key } = request;
        let segment = self.segments.segment_for(&key);

        let backend = self.backend.clone();
        let partition = self.segments.partition(segment).clone();

        self.segments
            .read_group(segment)
            .execute(&format!("del:{}", key), || async move {
                let exists = tokio::task::spawn_blocking(move || {
                    backend.view(|txn| Ok(txn.get(&partition, key.as_bytes())?.is_some()))
                })
                .await??;

                if !exists {
                    return Err(StoreError::NotFound);
                }
                // TODO: remove the entry and decide whether the ledger counters should shrink with it
                Err(StoreError::NotImplemented("delete"))
            })
            .await
    }
}
