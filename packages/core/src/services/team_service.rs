//! Team Administration Service
//!
//! Node mutation with safe media replacement, plus the tree read
//! operations the API layer exposes.
//!
//! # Media replacement contract
//!
//! Mutations follow a strict upload-new → persist → delete-old sequence:
//! the new object must exist in storage before the record is touched, and
//! superseded objects are only removed after the persistence write is
//! confirmed. At no point does the record reference a
//! deleted-but-not-yet-replaced key. The object store and the record store
//! are not transactionally linked, so cleanup is best-effort by design: a
//! failed delete leaves an unreferenced object behind (logged, never
//! escalated), which is a cleanup nuisance rather than a correctness bug.

use crate::config::{CoreConfig, TeamConfig};
use crate::db::TeamStore;
use crate::models::{TeamNode, TeamNodeUpdate};
use crate::services::{
    MediaResolver, TeamServiceError, TreeBuilder, TreeBuilderConfig, TreeNode,
};
use crate::storage::{ObjectStore, UploadRequest};
use std::sync::Arc;
use tracing::{info, warn};

/// Key prefix for team profile uploads.
const MEDIA_FOLDER: &str = "team_profiles";

/// Image content types accepted for upload.
const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// An uploaded media payload, as received from the API boundary.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: Option<String>,
}

/// Fields for creating a team node.
#[derive(Debug, Clone, Default)]
pub struct CreateMemberParams {
    pub name: Option<String>,
    pub role: Option<String>,
    pub samiti: Option<String>,
    pub parent_id: Option<String>,
}

/// Administration operations over the team hierarchy.
pub struct TeamService {
    store: Arc<dyn TeamStore>,
    objects: Arc<dyn ObjectStore>,
    builder: TreeBuilder,
    config: TeamConfig,
}

impl TeamService {
    /// Create a service from its collaborators.
    pub fn new(
        store: Arc<dyn TeamStore>,
        objects: Arc<dyn ObjectStore>,
        resolver: MediaResolver,
        config: TeamConfig,
    ) -> Self {
        let builder = TreeBuilder::new(
            store.clone(),
            resolver,
            TreeBuilderConfig {
                build_timeout: config.build_timeout,
                default_media: config.default_media.clone(),
            },
        );

        Self {
            store,
            objects,
            builder,
            config,
        }
    }

    /// Convenience constructor wiring the resolver from a [`CoreConfig`].
    pub fn from_config(
        store: Arc<dyn TeamStore>,
        objects: Arc<dyn ObjectStore>,
        config: &CoreConfig,
    ) -> Self {
        let resolver = MediaResolver::new(
            objects.clone(),
            config.storage.access,
            config.storage.signed_url_ttl,
        );
        Self::new(store, objects, resolver, config.team.clone())
    }

    /// Create a team node, optionally with an uploaded profile image.
    ///
    /// The upload happens before any persistence; an upload failure
    /// surfaces to the caller with nothing persisted. If persistence fails
    /// after a successful upload, the fresh object is best-effort deleted.
    ///
    /// # Returns
    ///
    /// The new node's id.
    pub async fn create_member(
        &self,
        params: CreateMemberParams,
        media: Option<MediaUpload>,
    ) -> Result<String, TeamServiceError> {
        let media_key = match media {
            Some(upload) => Some(self.upload_media(upload).await?),
            None => None,
        };

        let mut node = TeamNode::new(params.name, params.role, params.samiti, params.parent_id);
        if let Some(key) = &media_key {
            node.media_refs = vec![key.clone()];
        }
        node.validate()?;

        match self.store.upsert(node).await {
            Ok(created) => {
                info!(id = %created.id, "Team node created");
                Ok(created.id)
            }
            Err(e) => {
                if let Some(key) = media_key {
                    self.cleanup_key(&key).await;
                }
                Err(TeamServiceError::query_failed(e.to_string()))
            }
        }
    }

    /// Update a team node's fields and/or replace its profile image.
    ///
    /// Replacement protocol: upload the new object first (failure here
    /// mutates nothing), persist the record referencing only the new key
    /// (replace, not append), then best-effort delete the superseded keys.
    ///
    /// # Returns
    ///
    /// The updated node's subtree, rebuilt with freshly resolved media.
    pub async fn update_member(
        &self,
        id: &str,
        mut update: TeamNodeUpdate,
        media: Option<MediaUpload>,
    ) -> Result<TreeNode, TeamServiceError> {
        let existing = self
            .store
            .find_by_id(id)
            .await
            .map_err(|e| TeamServiceError::query_failed(e.to_string()))?
            .ok_or_else(|| TeamServiceError::node_not_found(id))?;

        let mut old_keys: Vec<String> = Vec::new();
        let mut new_key: Option<String> = None;

        if let Some(upload) = media {
            let key = self.upload_media(upload).await?;
            old_keys = existing.media_refs.clone();
            update.media_refs = Some(vec![key.clone()]);
            new_key = Some(key);
        }

        match self.store.update_fields(id, update).await {
            Ok(Some(_)) => {
                // Record is consistent; superseded objects are now garbage
                for key in &old_keys {
                    self.cleanup_key(key).await;
                }
                info!(id = %id, "Team node updated");
                self.builder.build(id).await
            }
            Ok(None) => {
                // Node vanished between the lookup and the write
                if let Some(key) = new_key {
                    self.cleanup_key(&key).await;
                }
                Err(TeamServiceError::node_not_found(id))
            }
            Err(e) => {
                // Record untouched; the fresh upload is the orphan to reap
                if let Some(key) = new_key {
                    self.cleanup_key(&key).await;
                }
                Err(TeamServiceError::query_failed(e.to_string()))
            }
        }
    }

    /// Clear a node's parent link; the node and its subtree become a
    /// separate root.
    pub async fn detach_member(&self, id: &str) -> Result<TeamNode, TeamServiceError> {
        self.store
            .detach(id)
            .await
            .map_err(|e| TeamServiceError::query_failed(e.to_string()))?
            .ok_or_else(|| TeamServiceError::node_not_found(id))
    }

    /// Build the subtree rooted at the given node.
    ///
    /// Works for any node id, so it serves both whole-tree and subtree
    /// reads; a missing id is a NotFound, never an empty tree.
    pub async fn build_tree(&self, root_id: &str) -> Result<TreeNode, TeamServiceError> {
        self.builder.build(root_id).await
    }

    /// Build the whole organization tree from the configured root.
    pub async fn build_full_tree(&self) -> Result<TreeNode, TeamServiceError> {
        let root_id = self
            .config
            .root_node_id
            .as_deref()
            .ok_or(TeamServiceError::RootNotConfigured)?;

        self.builder.build(root_id).await
    }

    /// Validate and upload a media payload, returning its storage key.
    async fn upload_media(&self, upload: MediaUpload) -> Result<String, TeamServiceError> {
        if !ALLOWED_IMAGE_TYPES.contains(&upload.content_type.as_str()) {
            return Err(TeamServiceError::unsupported_media_type(
                upload.content_type,
            ));
        }

        if upload.bytes.len() > self.config.max_upload_bytes {
            return Err(TeamServiceError::media_too_large(
                upload.bytes.len(),
                self.config.max_upload_bytes,
            ));
        }

        let key = self
            .objects
            .put(UploadRequest {
                bytes: upload.bytes,
                content_type: upload.content_type,
                folder: MEDIA_FOLDER.to_string(),
                filename: upload.filename,
            })
            .await?;

        Ok(key)
    }

    /// Best-effort object deletion; failures are logged, never escalated.
    async fn cleanup_key(&self, key: &str) {
        if let Err(e) = self.objects.delete(key).await {
            warn!(key = %key, error = %e, "Failed to clean up storage object");
        }
    }
}
