//! TeamStore Trait and libsql Implementation
//!
//! `TeamStore` is the only seam through which the rest of the crate talks
//! to hierarchy persistence. The trait keeps business logic independent of
//! the concrete backend; `TursoStore` implements it on top of
//! [`DatabaseService`].
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async to support both embedded and
//!    network backends
//! 2. **Not-found is not an error**: lookups return `Ok(None)`
//! 3. **Canonical writes**: `upsert` always persists `media_refs` as a JSON
//!    array of keys; legacy representations only ever appear on the read
//!    path, where they are normalized
//! 4. **Error Handling**: `anyhow::Result` for flexible error context at
//!    the trait seam

use crate::db::{DatabaseService, DbNodeParams};
use crate::models::{normalize_stored_value, StoredMediaValue, TeamNode, TeamNodeUpdate};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use libsql::Row;
use std::sync::Arc;
use tracing::debug;

/// Abstraction layer for team hierarchy persistence
///
/// Implementations must be `Send + Sync` to allow usage in async contexts
/// where futures may be moved between threads.
#[async_trait]
pub trait TeamStore: Send + Sync {
    /// Get a node by ID
    ///
    /// # Returns
    ///
    /// - `Ok(Some(node))` if the node exists
    /// - `Ok(None)` if it doesn't (not an error)
    /// - `Err(_)` on database failure
    async fn find_by_id(&self, id: &str) -> Result<Option<TeamNode>>;

    /// Get all children of a parent, ordered by `created_at` ascending
    ///
    /// An unknown parent id yields an empty list - the stable order makes
    /// tree shapes deterministic across repeated calls.
    async fn find_children(&self, parent_id: &str) -> Result<Vec<TeamNode>>;

    /// Create or replace a node
    ///
    /// Media references are persisted in canonical JSON-array form (blank
    /// entries dropped); raw legacy formats are never written back.
    async fn upsert(&self, node: TeamNode) -> Result<TeamNode>;

    /// Apply a sparse update to a node
    ///
    /// # Returns
    ///
    /// The updated node, or `Ok(None)` if the node doesn't exist.
    async fn update_fields(&self, id: &str, update: TeamNodeUpdate) -> Result<Option<TeamNode>>;

    /// Clear a node's parent reference, making it a root
    ///
    /// The node's subtree stays attached to it. Returns the updated node,
    /// or `Ok(None)` if the node doesn't exist.
    async fn detach(&self, id: &str) -> Result<Option<TeamNode>>;
}

/// TeamStore implementation for the Turso/libsql backend
///
/// A thin wrapper around [`DatabaseService`] that owns row-to-model
/// conversion, including the legacy media-reference decode.
pub struct TursoStore {
    /// Underlying database service (extracted SQL operations)
    db: Arc<DatabaseService>,
}

impl TursoStore {
    /// Create a new TursoStore wrapper
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Access the underlying database service
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    /// Parse a timestamp from the database
    ///
    /// New rows store RFC3339; rows migrated from older deployments may
    /// use SQLite's `CURRENT_TIMESTAMP` format (`YYYY-MM-DD HH:MM:SS`).
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        Err(anyhow::anyhow!(
            "Unable to parse timestamp '{}' as RFC3339 or SQLite format",
            s
        ))
    }

    /// Format a timestamp for persistence
    ///
    /// Microsecond precision keeps sibling ordering stable for nodes
    /// created in quick succession, and the fixed-width form sorts
    /// lexicographically.
    fn format_timestamp(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Convert a libsql Row to a TeamNode
    ///
    /// Expected columns (in order): id, name, role, samiti, parent_id,
    /// media_refs, created_at, modified_at.
    ///
    /// The media column is read as a raw value so that legacy BLOB rows and
    /// legacy text forms decode through the same normalization as canonical
    /// JSON arrays.
    fn row_to_node(row: &Row) -> Result<TeamNode> {
        let id: String = row.get(0).context("Failed to get id")?;
        let name: Option<String> = row.get(1).context("Failed to get name")?;
        let role: Option<String> = row.get(2).context("Failed to get role")?;
        let samiti: Option<String> = row.get(3).context("Failed to get samiti")?;
        let parent_id: Option<String> = row.get(4).context("Failed to get parent_id")?;
        let media_value = row.get_value(5).context("Failed to get media_refs")?;
        let created_at_str: String = row.get(6).context("Failed to get created_at")?;
        let modified_at_str: String = row.get(7).context("Failed to get modified_at")?;

        let created_at =
            Self::parse_timestamp(&created_at_str).context("Failed to parse created_at")?;
        let modified_at =
            Self::parse_timestamp(&modified_at_str).context("Failed to parse modified_at")?;

        let media_refs = normalize_stored_value(match media_value {
            libsql::Value::Null => StoredMediaValue::Absent,
            libsql::Value::Text(text) => StoredMediaValue::Text(text),
            libsql::Value::Blob(bytes) => StoredMediaValue::Binary(bytes),
            // Numeric values are not a known legacy form; discard them
            libsql::Value::Integer(_) | libsql::Value::Real(_) => StoredMediaValue::Absent,
        });

        Ok(TeamNode {
            id,
            name,
            role,
            samiti,
            parent_id,
            media_refs,
            created_at,
            modified_at,
        })
    }

    /// Serialize media references to the canonical JSON-array form,
    /// dropping blank entries.
    fn canonical_media_refs(keys: &[String]) -> Result<String> {
        let filtered: Vec<&str> = keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        serde_json::to_string(&filtered).context("Failed to serialize media refs")
    }
}

#[async_trait]
impl TeamStore for TursoStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<TeamNode>> {
        match self
            .db
            .db_get_node(id)
            .await
            .context("Failed to get node")?
        {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_children(&self, parent_id: &str) -> Result<Vec<TeamNode>> {
        let mut rows = self
            .db
            .db_get_children(parent_id)
            .await
            .context("Failed to query children")?;

        let mut children = Vec::new();
        while let Some(row) = rows.next().await.context("Failed to read child row")? {
            children.push(Self::row_to_node(&row)?);
        }

        debug!(parent_id, count = children.len(), "Fetched children");
        Ok(children)
    }

    async fn upsert(&self, node: TeamNode) -> Result<TeamNode> {
        let media_json = Self::canonical_media_refs(&node.media_refs)?;
        let created_at = Self::format_timestamp(&node.created_at);
        let modified_at = Self::format_timestamp(&node.modified_at);

        let params = DbNodeParams {
            id: &node.id,
            name: node.name.as_deref(),
            role: node.role.as_deref(),
            samiti: node.samiti.as_deref(),
            parent_id: node.parent_id.as_deref(),
            media_refs: &media_json,
            created_at: &created_at,
            modified_at: &modified_at,
        };

        self.db
            .db_upsert_node(params)
            .await
            .context("Failed to upsert node")?;

        self.find_by_id(&node.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Node not found after upsert"))
    }

    async fn update_fields(&self, id: &str, update: TeamNodeUpdate) -> Result<Option<TeamNode>> {
        let current = match self.find_by_id(id).await? {
            Some(node) => node,
            None => return Ok(None),
        };

        // Merge the sparse update over the current record
        let updated = TeamNode {
            id: current.id.clone(),
            name: update.name.or(current.name),
            role: update.role.or(current.role),
            samiti: update.samiti.or(current.samiti),
            parent_id: match update.parent_id {
                None => current.parent_id,
                Some(new_parent) => new_parent,
            },
            media_refs: update.media_refs.unwrap_or(current.media_refs),
            created_at: current.created_at,
            modified_at: Utc::now(),
        };

        let media_json = Self::canonical_media_refs(&updated.media_refs)?;
        let created_at = Self::format_timestamp(&updated.created_at);
        let modified_at = Self::format_timestamp(&updated.modified_at);

        let params = DbNodeParams {
            id: &updated.id,
            name: updated.name.as_deref(),
            role: updated.role.as_deref(),
            samiti: updated.samiti.as_deref(),
            parent_id: updated.parent_id.as_deref(),
            media_refs: &media_json,
            created_at: &created_at,
            modified_at: &modified_at,
        };

        let affected = self
            .db
            .db_update_node(params)
            .await
            .context("Failed to update node")?;

        if affected == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn detach(&self, id: &str) -> Result<Option<TeamNode>> {
        let modified_at = Self::format_timestamp(&Utc::now());

        let affected = self
            .db
            .db_detach_node(id, &modified_at)
            .await
            .context("Failed to detach node")?;

        if affected == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }
}
