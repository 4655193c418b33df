//! Media Reference Resolution
//!
//! Turns canonical storage keys into display URLs. Resolution is a display
//! concern: it never errors out of the resolver, because a broken image
//! must not block an otherwise valid tree response. Failures log at `warn`
//! and degrade to `None`.

use crate::storage::{MediaAccess, ObjectStore};
use futures::future::join_all;
use std::sync::Arc;
use tracing::warn;

/// Resolves storage keys to access URLs.
///
/// Behavior depends on the configured access mode: `Private` keys resolve
/// to time-limited signed URLs (freshly signed on every call - signed URLs
/// expire and are never cached), `PublicRead` keys resolve to stable
/// public URLs.
#[derive(Clone)]
pub struct MediaResolver {
    store: Arc<dyn ObjectStore>,
    access: MediaAccess,
    signed_url_ttl: u64,
}

impl MediaResolver {
    /// Create a resolver over the given object store.
    pub fn new(store: Arc<dyn ObjectStore>, access: MediaAccess, signed_url_ttl: u64) -> Self {
        Self {
            store,
            access,
            signed_url_ttl,
        }
    }

    /// Resolve a single key to a URL.
    ///
    /// Returns `None` for an empty/blank key or any storage failure, so
    /// callers can filter without branching on errors.
    pub async fn resolve_key(&self, key: &str) -> Option<String> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }

        match self.access {
            MediaAccess::PublicRead => Some(self.store.public_url(key)),
            MediaAccess::Private => match self.store.signed_url(key, self.signed_url_ttl).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to resolve media URL");
                    None
                }
            },
        }
    }

    /// Resolve a batch of keys, preserving input order.
    ///
    /// Each key resolves independently and concurrently; an individual
    /// failure yields `None` at that position instead of aborting the
    /// batch.
    pub async fn resolve_all(&self, keys: &[String]) -> Vec<Option<String>> {
        join_all(keys.iter().map(|key| self.resolve_key(key))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ObjectStore, UploadRequest};

    async fn store_with_object() -> (Arc<MemoryStore>, String) {
        let store = Arc::new(MemoryStore::default());
        let key = store
            .put(UploadRequest {
                bytes: vec![0xAB],
                content_type: "image/jpeg".to_string(),
                folder: "team_profiles".to_string(),
                filename: Some("pic.jpg".to_string()),
            })
            .await
            .unwrap();
        (store, key)
    }

    #[tokio::test]
    async fn test_empty_key_resolves_to_none() {
        let (store, _) = store_with_object().await;
        let resolver = MediaResolver::new(store, MediaAccess::Private, 900);

        assert!(resolver.resolve_key("").await.is_none());
        assert!(resolver.resolve_key("   ").await.is_none());
    }

    #[tokio::test]
    async fn test_public_mode_uses_stable_urls() {
        let (store, key) = store_with_object().await;
        let resolver = MediaResolver::new(store, MediaAccess::PublicRead, 900);

        let first = resolver.resolve_key(&key).await.unwrap();
        let second = resolver.resolve_key(&key).await.unwrap();
        assert_eq!(first, second);
        assert!(first.contains(&key));
    }

    #[tokio::test]
    async fn test_private_mode_signs_urls() {
        let (store, key) = store_with_object().await;
        let resolver = MediaResolver::new(store, MediaAccess::Private, 900);

        let url = resolver.resolve_key(&key).await.unwrap();
        assert!(url.contains("expires=900"));
    }

    #[tokio::test]
    async fn test_sign_failure_degrades_to_none() {
        let (store, _) = store_with_object().await;
        let resolver = MediaResolver::new(store, MediaAccess::Private, 900);

        assert!(resolver.resolve_key("ghost/missing.jpg").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_all_preserves_order_and_isolates_failures() {
        let (store, key) = store_with_object().await;
        let resolver = MediaResolver::new(store, MediaAccess::Private, 900);

        let keys = vec![
            key.clone(),
            "ghost/broken.jpg".to_string(),
            String::new(),
            key.clone(),
        ];
        let resolved = resolver.resolve_all(&keys).await;

        assert_eq!(resolved.len(), 4);
        assert!(resolved[0].is_some());
        assert!(resolved[1].is_none());
        assert!(resolved[2].is_none());
        assert!(resolved[3].is_some());
    }
}
