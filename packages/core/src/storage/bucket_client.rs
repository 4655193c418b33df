//! HTTP object-storage client.
//!
//! Talks to a Supabase-storage-compatible REST API with a service key:
//! uploads via `POST /object/{bucket}/{key}`, deletes via `DELETE` (an
//! already-absent object is success), signing via
//! `POST /object/sign/{bucket}/{key}`. Public URLs come from a configured
//! public base when set, otherwise from the standard public object path.

use crate::config::StorageConfig;
use crate::storage::{object_key, ObjectStore, StorageError, UploadRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

/// Object-storage client configuration and HTTP plumbing.
#[derive(Clone)]
pub struct BucketClient {
    client: Client,
    base_url: String,
    bucket: String,
    service_key: String,
    public_base: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl BucketClient {
    /// Create a client from a storage configuration.
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            service_key: config.service_key.clone(),
            public_base: config.public_base.clone(),
        }
    }

    /// Create a client from environment variables.
    ///
    /// Requires `STORAGE_URL`, `STORAGE_BUCKET`, and `STORAGE_SERVICE_KEY`.
    pub fn from_env() -> Result<Self, StorageError> {
        let base_url = std::env::var("STORAGE_URL")
            .map_err(|_| StorageError::config("STORAGE_URL not set"))?;
        let bucket = std::env::var("STORAGE_BUCKET")
            .map_err(|_| StorageError::config("STORAGE_BUCKET not set"))?;
        let service_key = std::env::var("STORAGE_SERVICE_KEY")
            .map_err(|_| StorageError::config("STORAGE_SERVICE_KEY not set"))?;
        let public_base = std::env::var("STORAGE_PUBLIC_BASE").ok();

        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket,
            service_key,
            public_base,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for BucketClient {
    async fn put(&self, request: UploadRequest) -> Result<String, StorageError> {
        let key = object_key(&request.folder, request.filename.as_deref());
        let url = self.object_url(&key);

        debug!(key = %key, size = request.bytes.len(), "Uploading object");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("Content-Type", &request.content_type)
            .body(request.bytes)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(StorageError::upload_failed(format!(
                "{} - {}",
                status, text
            )));
        }

        info!(key = %key, "Uploaded object");
        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if key.is_empty() {
            return Ok(());
        }

        let url = self.object_url(key);

        let resp = self
            .client
            .delete(&url)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        // Idempotent: an already-deleted object is success
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(StorageError::delete_failed(
                key,
                format!("{} - {}", status, text),
            ));
        }

        debug!(key = %key, "Deleted object");
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl_seconds: u64) -> Result<String, StorageError> {
        let url = format!("{}/object/sign/{}/{}", self.base_url, self.bucket, key);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .json(&json!({ "expiresIn": ttl_seconds }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(StorageError::sign_failed(
                key,
                format!("{} - {}", status, text),
            ));
        }

        let signed: SignResponse = resp
            .json()
            .await
            .map_err(|e| StorageError::sign_failed(key, e.to_string()))?;

        // The API returns a relative path
        Ok(format!(
            "{}{}",
            self.base_url,
            signed.signed_url
        ))
    }

    fn public_url(&self, key: &str) -> String {
        match &self.public_base {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!(
                "{}/object/public/{}/{}",
                self.base_url, self.bucket, key
            ),
        }
    }
}
