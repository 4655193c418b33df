//! Runtime configuration.
//!
//! Loaded from environment variables with defaults for everything except
//! storage credentials. Host applications construct the services from a
//! [`CoreConfig`]; tests build the structs directly.

use crate::storage::{MediaAccess, StorageError};
use std::time::Duration;

/// Default TTL for signed download URLs, in seconds.
pub const DEFAULT_SIGNED_URL_TTL: u64 = 900;

/// Default placeholder shown when a node has no resolvable media.
pub const DEFAULT_MEDIA_PLACEHOLDER: &str = "/defaults/avatar.png";

/// Default cap on uploaded media payloads (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default bound on a whole tree build.
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 30;

/// Object-storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base URL of the storage API
    pub base_url: String,
    /// Bucket name
    pub bucket: String,
    /// Service key used as Bearer token
    pub service_key: String,
    /// Access-control mode for uploaded objects
    pub access: MediaAccess,
    /// TTL for signed URLs, in seconds
    pub signed_url_ttl: u64,
    /// Optional base for public URLs (e.g. a CDN front)
    pub public_base: Option<String>,
}

/// Team hierarchy configuration.
#[derive(Debug, Clone)]
pub struct TeamConfig {
    /// ID of the organization root used by the full-tree read
    pub root_node_id: Option<String>,
    /// Placeholder URL when a node has no resolvable media
    pub default_media: String,
    /// Upper bound on uploaded media payloads, in bytes
    pub max_upload_bytes: usize,
    /// Upper bound on a whole tree build
    pub build_timeout: Duration,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            root_node_id: None,
            default_media: DEFAULT_MEDIA_PLACEHOLDER.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            build_timeout: Duration::from_secs(DEFAULT_BUILD_TIMEOUT_SECS),
        }
    }
}

/// Top-level configuration for the core services.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub storage: StorageConfig,
    pub team: TeamConfig,
}

impl CoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Required: `STORAGE_URL`, `STORAGE_BUCKET`, `STORAGE_SERVICE_KEY`.
    ///
    /// Optional (with defaults): `STORAGE_OBJECT_ACL` (`private`),
    /// `STORAGE_SIGNED_URL_TTL` (900), `STORAGE_PUBLIC_BASE`,
    /// `TEAM_ROOT_NODE_ID`, `TEAM_DEFAULT_AVATAR` (`/defaults/avatar.png`),
    /// `TEAM_MAX_UPLOAD_BYTES` (10 MiB), `TREE_BUILD_TIMEOUT_SECS` (30).
    pub fn from_env() -> Result<Self, StorageError> {
        let base_url = required_var("STORAGE_URL")?;
        let bucket = required_var("STORAGE_BUCKET")?;
        let service_key = required_var("STORAGE_SERVICE_KEY")?;

        let access = match std::env::var("STORAGE_OBJECT_ACL") {
            Ok(raw) => raw.parse::<MediaAccess>()?,
            Err(_) => MediaAccess::default(),
        };

        let signed_url_ttl =
            parsed_var("STORAGE_SIGNED_URL_TTL", DEFAULT_SIGNED_URL_TTL)?;
        let max_upload_bytes =
            parsed_var("TEAM_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let build_timeout_secs =
            parsed_var("TREE_BUILD_TIMEOUT_SECS", DEFAULT_BUILD_TIMEOUT_SECS)?;

        Ok(Self {
            storage: StorageConfig {
                base_url,
                bucket,
                service_key,
                access,
                signed_url_ttl,
                public_base: std::env::var("STORAGE_PUBLIC_BASE").ok(),
            },
            team: TeamConfig {
                root_node_id: std::env::var("TEAM_ROOT_NODE_ID").ok(),
                default_media: std::env::var("TEAM_DEFAULT_AVATAR")
                    .unwrap_or_else(|_| DEFAULT_MEDIA_PLACEHOLDER.to_string()),
                max_upload_bytes,
                build_timeout: Duration::from_secs(build_timeout_secs),
            },
        })
    }
}

fn required_var(name: &str) -> Result<String, StorageError> {
    std::env::var(name).map_err(|_| StorageError::config(format!("{} not set", name)))
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, StorageError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| StorageError::config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_config_defaults() {
        let config = TeamConfig::default();

        assert_eq!(config.default_media, "/defaults/avatar.png");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.build_timeout, Duration::from_secs(30));
        assert!(config.root_node_id.is_none());
    }
}
