pub mod memory;
pub mod s3;
pub mod writer;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryBlobStore;
pub use s3::{S3BlobStore, S3Config};
pub use writer::BlobWriter;

/// The object-store capabilities the pipeline needs. Implementations must be
/// safe to share across concurrently running ingestion tasks.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Creates the bucket. Creating a bucket that already exists and is owned
    /// by the caller is not an error.
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()>;

    /// Writes (or overwrites) a single object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;

    /// Cheapest round-trip that proves the store is reachable.
    async fn list_buckets(&self) -> Result<Vec<String>>;
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("bucket {bucket} unavailable: {cause}")]
    Bucket { bucket: String, cause: anyhow::Error },

    #[error("upload of {key} failed: {cause}")]
    Upload { key: String, cause: anyhow::Error },

    #[error("sidecar for {id} could not be serialized: {cause}")]
    Sidecar { id: String, cause: serde_json::Error },

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
}
