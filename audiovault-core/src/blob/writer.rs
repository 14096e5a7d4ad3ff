use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use super::{BlobStore, StorageError};
use crate::artifact::{audio_key, sidecar_key};

/// Uploads an artifact's audio and sidecar into a single well-known bucket.
#[derive(Clone)]
pub struct BlobWriter {
    store: Arc<dyn BlobStore>,
    bucket: String,
    region: String,
    timeout: Duration,
}

impl BlobWriter {
    pub fn new(
        store: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
        region: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            region: region.into(),
            timeout,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Ensures the bucket exists, then writes `{id}.wav` followed by
    /// `{id}.json`. Re-storing an id overwrites both objects.
    ///
    /// The two puts are not atomic: if the sidecar upload fails the audio
    /// object stays behind, so readers must treat `{id}.json` as optional.
    pub async fn store(
        &self,
        id: &str,
        audio: &[u8],
        sidecar: Option<&Value>,
    ) -> Result<(), StorageError> {
        self.ensure_bucket().await?;

        let sidecar_body = serde_json::to_vec(sidecar.unwrap_or(&Value::Null)).map_err(|cause| {
            StorageError::Sidecar {
                id: id.to_string(),
                cause,
            }
        })?;

        self.put(&audio_key(id), audio.to_vec(), "audio/wav").await?;
        self.put(&sidecar_key(id), sidecar_body, "application/json")
            .await?;

        debug!(id, bucket = %self.bucket, "Audio and sidecar stored");
        Ok(())
    }

    /// Idempotent precondition for `store`. Never short-circuits the upload:
    /// a freshly created bucket is written to in the same call.
    pub async fn ensure_bucket(&self) -> Result<(), StorageError> {
        let exists = self
            .bounded("bucket check", self.store.bucket_exists(&self.bucket))
            .await?
            .map_err(|cause| StorageError::Bucket {
                bucket: self.bucket.clone(),
                cause,
            })?;

        if exists {
            return Ok(());
        }

        info!(bucket = %self.bucket, region = %self.region, "Bucket missing, creating it");
        self.bounded(
            "bucket creation",
            self.store.create_bucket(&self.bucket, &self.region),
        )
        .await?
        .map_err(|cause| StorageError::Bucket {
            bucket: self.bucket.clone(),
            cause,
        })?;
        info!(bucket = %self.bucket, "Bucket created");
        Ok(())
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.bounded(
            &format!("upload of {key}"),
            self.store
                .put_object(&self.bucket, key, body, content_type),
        )
        .await?
        .map_err(|cause| StorageError::Upload {
            key: key.to_string(),
            cause,
        })
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = T>,
    ) -> Result<T, StorageError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StorageError::Timeout {
                operation: operation.to_string(),
                after: self.timeout,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::mock::MockBehavior;
    use serde_json::json;

    fn writer(store: &MemoryBlobStore) -> BlobWriter {
        BlobWriter::new(
            Arc::new(store.clone()),
            "opentts-audio",
            "us-east-1",
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn creates_missing_bucket_and_still_uploads() {
        let store = MemoryBlobStore::new();
        assert!(!store.has_bucket("opentts-audio"));

        writer(&store)
            .store("a1", &[1, 2, 3], Some(&json!({"chunks": [1, 2]})))
            .await
            .unwrap();

        assert!(store.has_bucket("opentts-audio"));
        assert_eq!(
            store.object("opentts-audio", "a1.wav").unwrap().body,
            vec![1, 2, 3]
        );
        let sidecar = store.object("opentts-audio", "a1.json").unwrap();
        assert_eq!(sidecar.body, br#"{"chunks":[1,2]}"#.to_vec());
        assert_eq!(sidecar.content_type, "application/json");
    }

    #[tokio::test]
    async fn missing_sidecar_is_stored_as_null() {
        let store = MemoryBlobStore::new();
        writer(&store).store("a2", &[9], None).await.unwrap();
        assert_eq!(
            store.object("opentts-audio", "a2.json").unwrap().body,
            b"null".to_vec()
        );
    }

    #[tokio::test]
    async fn sidecar_failure_leaves_audio_behind() {
        let store = MemoryBlobStore::with_behavior(MockBehavior::FailKeysEndingWith(
            ".json".to_string(),
        ));
        let err = writer(&store).store("a3", &[7], None).await.unwrap_err();

        assert!(matches!(err, StorageError::Upload { ref key, .. } if key == "a3.json"));
        assert!(store.object("opentts-audio", "a3.wav").is_some());
        assert!(store.object("opentts-audio", "a3.json").is_none());
    }

    #[tokio::test]
    async fn hanging_store_times_out() {
        let store = MemoryBlobStore::with_behavior(MockBehavior::Hang);
        let err = writer(&store).store("a4", &[7], None).await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout { .. }), "got {err:?}");
    }
}
