//! Object Storage Error Types

use thiserror::Error;

/// Object storage operation errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Upload to the object store failed
    #[error("Upload failed: {context}")]
    UploadFailed { context: String },

    /// Delete of a stored object failed
    #[error("Delete failed for '{key}': {context}")]
    DeleteFailed { key: String, context: String },

    /// Signing a download URL failed
    #[error("Failed to sign URL for '{key}': {context}")]
    SignFailed { key: String, context: String },

    /// HTTP transport failure
    #[error("Storage request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Missing or invalid storage configuration
    #[error("Storage configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Create an upload failed error
    pub fn upload_failed(context: impl Into<String>) -> Self {
        Self::UploadFailed {
            context: context.into(),
        }
    }

    /// Create a delete failed error
    pub fn delete_failed(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::DeleteFailed {
            key: key.into(),
            context: context.into(),
        }
    }

    /// Create a sign failed error
    pub fn sign_failed(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::SignFailed {
            key: key.into(),
            context: context.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
