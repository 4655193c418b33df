//! Recursive Team Tree Construction
//!
//! Rebuilds the nested organizational tree from the flat `parent_id`
//! records, attaching resolved media URLs to every node.
//!
//! # Algorithm
//!
//! Depth-first recursion per node: fetch the record, resolve its media,
//! fetch its children (already ordered by creation time), then build every
//! child subtree concurrently. Sibling subtrees are independent
//! subproblems with no shared mutable state, so the fan-out is safe; the
//! `join_all` keeps results in the stored sibling order regardless of
//! completion order.
//!
//! # Failure posture
//!
//! - A missing node lookup terminates that branch with `None` - a dangling
//!   child reference silently vanishes from the tree instead of failing
//!   the whole response. Only the requested root maps `None` to NotFound.
//! - Media failures were already degraded to `None` by the resolver.
//! - A `parent_id` cycle would otherwise recurse forever; the builder
//!   tracks the ancestor chain and drops any node found on its own path,
//!   with a warning.
//!
//! Recursion depth is unbounded by design (the schema allows arbitrary
//! nesting); the boxed async recursion keeps frames on the heap, and the
//! configured overall timeout bounds total build latency instead of an
//! artificial depth cap.

use crate::config::{DEFAULT_BUILD_TIMEOUT_SECS, DEFAULT_MEDIA_PLACEHOLDER};
use crate::db::TeamStore;
use crate::services::{MediaResolver, TeamServiceError};
use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Tree construction settings.
#[derive(Debug, Clone)]
pub struct TreeBuilderConfig {
    /// Upper bound on a whole build (all lookups and URL resolutions)
    pub build_timeout: Duration,
    /// Placeholder used as `primary_media` when a node has no resolvable media
    pub default_media: String,
}

impl Default for TreeBuilderConfig {
    fn default() -> Self {
        Self {
            build_timeout: Duration::from_secs(DEFAULT_BUILD_TIMEOUT_SECS),
            default_media: DEFAULT_MEDIA_PLACEHOLDER.to_string(),
        }
    }
}

/// One node of a built tree response.
///
/// `children` and `display_media` are always present (empty vectors, never
/// absent), because consumers of this shape index into them without
/// null checks. `primary_media` carries the first resolved URL or the
/// configured placeholder - some callers expect a single canonical image,
/// others a gallery, so both views are included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub samiti: Option<String>,
    pub parent_id: Option<String>,
    /// All resolved media URLs, in stored display order
    pub display_media: Vec<String>,
    /// First resolved URL, or the configured placeholder
    pub primary_media: String,
    pub created_at: DateTime<Utc>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Total number of nodes in this subtree (including self).
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TreeNode::node_count)
            .sum::<usize>()
    }
}

/// Reconstructs hierarchy subtrees with resolved media.
///
/// Stateless across builds: no node or URL caching, so signed URLs are
/// freshly minted per request.
#[derive(Clone)]
pub struct TreeBuilder {
    store: Arc<dyn TeamStore>,
    resolver: MediaResolver,
    config: TreeBuilderConfig,
}

impl TreeBuilder {
    /// Create a builder over the given store and resolver.
    pub fn new(
        store: Arc<dyn TeamStore>,
        resolver: MediaResolver,
        config: TreeBuilderConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            config,
        }
    }

    /// Build the subtree rooted at `root_id`.
    ///
    /// # Errors
    ///
    /// - [`TeamServiceError::NodeNotFound`] if the requested root does not
    ///   exist (distinct from the internal orphan filtering)
    /// - [`TeamServiceError::BuildTimeout`] if the whole build exceeds the
    ///   configured bound
    /// - [`TeamServiceError::QueryFailed`] on persistence failure
    pub async fn build(&self, root_id: &str) -> Result<TreeNode, TeamServiceError> {
        let fut = self.build_node(root_id.to_string(), HashSet::new());

        match tokio::time::timeout(self.config.build_timeout, fut).await {
            Ok(Ok(Some(tree))) => Ok(tree),
            Ok(Ok(None)) => Err(TeamServiceError::node_not_found(root_id)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(TeamServiceError::build_timeout(
                root_id,
                self.config.build_timeout.as_secs(),
            )),
        }
    }

    /// Recursively build one node.
    ///
    /// Returns `Ok(None)` when the node does not exist or sits on its own
    /// ancestor path; callers filter those out of children lists.
    /// Boxed because async recursion needs an indirection point.
    fn build_node(
        &self,
        id: String,
        ancestors: HashSet<String>,
    ) -> BoxFuture<'_, Result<Option<TreeNode>, TeamServiceError>> {
        Box::pin(async move {
            if ancestors.contains(&id) {
                warn!(id = %id, "Parent cycle detected; dropping node from tree");
                return Ok(None);
            }

            let node = match self
                .store
                .find_by_id(&id)
                .await
                .map_err(|e| TeamServiceError::query_failed(e.to_string()))?
            {
                Some(node) => node,
                // Dangling reference: this branch vanishes from the output
                None => return Ok(None),
            };

            let resolved = self.resolver.resolve_all(&node.media_refs).await;
            let display_media: Vec<String> = resolved.into_iter().flatten().collect();
            let primary_media = display_media
                .first()
                .cloned()
                .unwrap_or_else(|| self.config.default_media.clone());

            let child_rows = self
                .store
                .find_children(&node.id)
                .await
                .map_err(|e| TeamServiceError::query_failed(e.to_string()))?;

            let mut path = ancestors;
            path.insert(node.id.clone());

            // Sibling subtrees build concurrently; join_all preserves the
            // stored order independent of completion order.
            let subtrees = join_all(
                child_rows
                    .iter()
                    .map(|child| self.build_node(child.id.clone(), path.clone())),
            )
            .await;

            let mut children = Vec::with_capacity(subtrees.len());
            for subtree in subtrees {
                if let Some(child) = subtree? {
                    children.push(child);
                }
            }

            Ok(Some(TreeNode {
                id: node.id,
                name: node.name,
                role: node.role,
                samiti: node.samiti,
                parent_id: node.parent_id,
                display_media,
                primary_media,
                created_at: node.created_at,
                children,
            }))
        })
    }
}
