//! In-process object store.
//!
//! Backed by `RwLock<HashMap>`, used by tests and local development.
//! Signing an absent key fails, which lets callers exercise the
//! degrade-on-failure path of URL resolution.

use crate::storage::{object_key, ObjectStore, StorageError, UploadRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A stored object: payload plus content type.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory implementation of [`ObjectStore`].
#[derive(Clone)]
pub struct MemoryStore {
    bucket: String,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl MemoryStore {
    /// Create an empty store for the named bucket.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check whether a key currently exists.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().unwrap().contains_key(key)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().unwrap().is_empty()
    }

    /// Fetch a stored object (returns a clone).
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().unwrap().get(key).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("sangam-media")
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, request: UploadRequest) -> Result<String, StorageError> {
        let key = object_key(&request.folder, request.filename.as_deref());

        self.objects.write().unwrap().insert(
            key.clone(),
            StoredObject {
                bytes: request.bytes,
                content_type: request.content_type,
            },
        );

        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        // Idempotent: removing an absent key is a no-op
        self.objects.write().unwrap().remove(key);
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl_seconds: u64) -> Result<String, StorageError> {
        if !self.contains(key) {
            return Err(StorageError::sign_failed(key, "object does not exist"));
        }

        // Token differs per call, mirroring real signed URLs
        Ok(format!(
            "memory://{}/{}?expires={}&token={}",
            self.bucket,
            key,
            ttl_seconds,
            Uuid::new_v4()
        ))
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://{}/{}", self.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> UploadRequest {
        UploadRequest {
            bytes: vec![1, 2, 3],
            content_type: "image/png".to_string(),
            folder: "team_profiles".to_string(),
            filename: Some(name.to_string()),
        }
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::default();

        let key = store.put(upload("a.png")).await.unwrap();
        assert!(store.contains(&key));
        assert_eq!(store.get(&key).unwrap().content_type, "image/png");

        store.delete(&key).await.unwrap();
        assert!(!store.contains(&key));

        // Deleting again is still a success
        store.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_signed_url_requires_existing_object() {
        let store = MemoryStore::default();

        let key = store.put(upload("b.jpg")).await.unwrap();
        let url = store.signed_url(&key, 900).await.unwrap();
        assert!(url.contains(&key));
        assert!(url.contains("expires=900"));

        assert!(store.signed_url("missing/key.jpg", 900).await.is_err());
    }

    #[tokio::test]
    async fn test_public_url_is_stable() {
        let store = MemoryStore::new("bucket-x");
        assert_eq!(
            store.public_url("gallery/g.webp"),
            "memory://bucket-x/gallery/g.webp"
        );
    }
}
