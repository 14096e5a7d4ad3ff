use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use super::BlobStore;
use crate::mock::{MockBehavior, SharedBehavior};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

type Buckets = HashMap<String, HashMap<String, StoredObject>>;

/// In-process blob store used by tests and local runs without MinIO.
/// Clones share the same buckets.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    buckets: Arc<Mutex<Buckets>>,
    behavior: SharedBehavior,
    put_count: Arc<Mutex<usize>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior: SharedBehavior::new(behavior),
            ..Self::default()
        }
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        self.behavior.set(behavior);
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().unwrap().contains_key(bucket)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let buckets = self.buckets.lock().unwrap();
        let mut keys: Vec<String> = buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Number of successful `put_object` calls, overwrites included.
    pub fn put_count(&self) -> usize {
        *self.put_count.lock().unwrap()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.behavior.probe_gate().await?;
        Ok(self.has_bucket(bucket))
    }

    async fn create_bucket(&self, bucket: &str, _region: &str) -> Result<()> {
        self.behavior.write_gate(bucket).await?;
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.behavior.write_gate(key).await?;
        let mut buckets = self.buckets.lock().unwrap();
        let Some(objects) = buckets.get_mut(bucket) else {
            anyhow::bail!("NoSuchBucket: {bucket}")
        };
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        *self.put_count.lock().unwrap() += 1;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        self.behavior.probe_gate().await?;
        Ok(self.buckets.lock().unwrap().keys().cloned().collect())
    }
}
