//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations. The split
//! follows the failure taxonomy of the domain: not-found and upload
//! failures surface to callers; orphan references and media decode
//! failures are recovered inside the services and never appear here.

use crate::models::ValidationError;
use crate::storage::StorageError;
use thiserror::Error;

/// Team service operation errors
#[derive(Error, Debug)]
pub enum TeamServiceError {
    /// Requested node does not exist
    #[error("Team node not found: {id}")]
    NodeNotFound { id: String },

    /// Validation failed for a node
    #[error("Node validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Persistence operation failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Object storage operation failed
    ///
    /// Only raised for mutations (uploads backing a record change).
    /// Resolution and cleanup failures degrade instead of erroring.
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    /// Uploaded media has a content type outside the allowed image set
    #[error("Unsupported media type: {content_type}")]
    UnsupportedMediaType { content_type: String },

    /// Uploaded media exceeds the configured size cap
    #[error("Media payload of {size} bytes exceeds limit of {max} bytes")]
    MediaTooLarge { size: usize, max: usize },

    /// Whole-tree build exceeded its latency bound
    #[error("Tree build for '{root_id}' exceeded {timeout_secs}s")]
    BuildTimeout { root_id: String, timeout_secs: u64 },

    /// The organization root id is not configured
    #[error("Organization root node is not configured")]
    RootNotConfigured,
}

impl TeamServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create a query failed error
    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }

    /// Create an unsupported media type error
    pub fn unsupported_media_type(content_type: impl Into<String>) -> Self {
        Self::UnsupportedMediaType {
            content_type: content_type.into(),
        }
    }

    /// Create a media too large error
    pub fn media_too_large(size: usize, max: usize) -> Self {
        Self::MediaTooLarge { size, max }
    }

    /// Create a build timeout error
    pub fn build_timeout(root_id: impl Into<String>, timeout_secs: u64) -> Self {
        Self::BuildTimeout {
            root_id: root_id.into(),
            timeout_secs,
        }
    }
}
