//! Object Storage Layer
//!
//! The `ObjectStore` trait is the only seam through which the crate talks
//! to blob storage. Two implementations are provided:
//!
//! - [`BucketClient`] - reqwest client for an HTTP object-storage API
//! - [`MemoryStore`] - in-process store for tests and local development
//!
//! Keys follow the `<folder>/<uuid><ext>` scheme, so a key never collides
//! and the original filename only contributes its extension.

mod bucket_client;
mod error;
mod memory;

pub use bucket_client::BucketClient;
pub use error::StorageError;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// Access-control mode for stored objects
///
/// Decides how a storage key resolves to a display URL:
/// `Private` objects get a time-limited signed URL, `PublicRead` objects
/// get a stable public URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaAccess {
    /// Objects are private; reads go through signed URLs
    #[default]
    Private,
    /// Objects are world-readable; reads use deterministic public URLs
    PublicRead,
}

impl FromStr for MediaAccess {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public-read" => Ok(Self::PublicRead),
            other => Err(StorageError::config(format!(
                "Unknown access mode '{}' (expected 'private' or 'public-read')",
                other
            ))),
        }
    }
}

/// Parameters for an object upload (avoids too-many-arguments lint)
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Raw object bytes
    pub bytes: Vec<u8>,
    /// MIME type of the payload
    pub content_type: String,
    /// Key prefix, e.g. "team_profiles"
    pub folder: String,
    /// Original filename; only its extension is kept
    pub filename: Option<String>,
}

/// Abstraction over a blob store
///
/// Implementations must be `Send + Sync`. All failures surface as
/// [`StorageError`]; callers decide whether a failure is fatal (uploads
/// backing a record mutation) or degradable (URL resolution, cleanup).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload an object and return its storage key
    async fn put(&self, request: UploadRequest) -> Result<String, StorageError>;

    /// Delete an object by key
    ///
    /// Idempotent: deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Produce a time-limited signed download URL for a key
    async fn signed_url(&self, key: &str, ttl_seconds: u64) -> Result<String, StorageError>;

    /// Produce a stable public URL for a key
    ///
    /// Only meaningful when the object is world-readable.
    fn public_url(&self, key: &str) -> String;
}

/// Generate a storage key: `<folder>/<uuid><ext>`
///
/// The extension is taken from the original filename when present.
pub(crate) fn object_key(folder: &str, filename: Option<&str>) -> String {
    let ext = filename
        .and_then(|f| Path::new(f).extension())
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let id = Uuid::new_v4();
    if folder.is_empty() {
        format!("{}{}", id, ext)
    } else {
        format!("{}/{}{}", folder, id, ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_shape() {
        let key = object_key("team_profiles", Some("photo.jpg"));
        assert!(key.starts_with("team_profiles/"));
        assert!(key.ends_with(".jpg"));

        let bare = object_key("", None);
        assert!(!bare.contains('/'));
        assert!(!bare.contains('.'));
    }

    #[test]
    fn test_object_keys_are_unique() {
        let a = object_key("gallery", Some("same.png"));
        let b = object_key("gallery", Some("same.png"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_media_access_from_str() {
        assert_eq!("private".parse::<MediaAccess>().unwrap(), MediaAccess::Private);
        assert_eq!(
            "public-read".parse::<MediaAccess>().unwrap(),
            MediaAccess::PublicRead
        );
        assert!("acl-nonsense".parse::<MediaAccess>().is_err());
    }
}
