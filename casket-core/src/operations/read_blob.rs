use crate::backend::Backend;
use crate::error::{Result, StoreError};
use crate::key::Key;
use crate::segment::Segments;
use bytes::Bytes;
use std::sync::Arc;

pub struct ReadBlobOperation<B> {
    backend: Arc<B>,
    segments: Arc<Segments>,
}

#[derive(Debug, Clone, Copy)]
pub struct ReadBlobOperationRequest {
    pub key: Key,
}

impl<B: Backend> ReadBlobOperation<B> {
    pub fn new(backend: Arc<B>, segments: Arc<Segments>) -> Self {
        Self { backend, segments }
    }

    /// Fetch the stored bytes for a key, unchanged.
    pub async fn run(&self, request: ReadBlobOperationRequest) -> Result<Bytes> {
        let ReadBlobOperationRequest { key } = request;
        let segment = self.segments.segment_for(&key);

        let backend = self.backend.clone();
        let partition = self.segments.partition(segment).clone();

        self.segments
            .read_group(segment)
            .execute(&format!("get:{}", key), || async move {
                let value = tokio::task::spawn_blocking(move || {
                    backend.view(|txn| txn.get(&partition, key.as_bytes()))
                })
                .await??;

                value.map(Bytes::from).ok_or(StoreError::NotFound)
            })
            .await
    }
}
