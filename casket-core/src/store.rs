use crate::backend::Backend;
use crate::error::Result;
use crate::key::Key;
use crate::ledger::{LedgerStats, MetadataLedger};
use crate::operations::{
    DeleteBlobOperation, DeleteBlobOperationRequest, PutBlobOperation, PutBlobOperationRequest,
    ReadBlobOperation, ReadBlobOperationRequest,
};
use crate::segment::{DEFAULT_SEGMENTS, Segments};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub segments: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            segments: DEFAULT_SEGMENTS,
        }
    }
}

/// Content-addressed blob store over a transactional backend.
pub struct BlobStore<B> {
    backend: Arc<B>,
    segments: Arc<Segments>,
    ledger: Arc<MetadataLedger<B>>,
    put_blob: PutBlobOperation<B>,
    read_blob: ReadBlobOperation<B>,
    delete_blob: DeleteBlobOperation<B>,
}

impl<B: Backend> BlobStore<B> {
    pub fn open(backend: B, options: StoreOptions) -> Result<Self> {
        let backend = Arc::new(backend);
        let segments = Arc::new(Segments::open(&*backend, options.segments)?);
        let ledger = Arc::new(MetadataLedger::open(backend.clone())?);

        tracing::info!("Blob store opened with {} segments", segments.count());

        Ok(Self {
            put_blob: PutBlobOperation::new(backend.clone(), segments.clone(), ledger.clone()),
            read_blob: ReadBlobOperation::new(backend.clone(), segments.clone()),
            delete_blob: DeleteBlobOperation::new(backend.clone(), segments.clone()),
            backend,
            segments,
            ledger,
        })
    }

    /// Add a value and return its computed key.
    pub async fn put(&self, value: Option<Bytes>) -> Result<Key> {
        let result = self.put_blob.run(PutBlobOperationRequest { value }).await?;
        Ok(result.key)
    }

    pub async fn get(&self, key: Key) -> Result<Bytes> {
        self.read_blob.run(ReadBlobOperationRequest { key }).await
    }

    pub async fn del(&self, key: Key) -> Result<Bytes> {
        self.delete_blob
            .run(DeleteBlobOperationRequest { key })
            .await
    }

    /// Human-readable ledger summary, e.g. `object-cnt:1 - totsize:5`.
    pub async fn info(&self) -> Result<Bytes> {
        let stats = self.ledger.snapshot().await?;
        Ok(Bytes::from(stats.to_string()))
    }

    pub async fn stats(&self) -> Result<LedgerStats> {
        self.ledger.snapshot().await
    }

    pub fn segment_count(&self) -> usize {
        self.segments.count()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
