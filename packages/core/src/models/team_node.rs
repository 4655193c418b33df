//! Team Hierarchy Data Structures
//!
//! This module defines the `TeamNode` struct and related types for the
//! organizational team tree.
//!
//! # Architecture
//!
//! - **Flat records**: Nodes are persisted flat with a `parent_id`
//!   back-reference; the nested tree shape is reconstructed at read time.
//! - **Roots**: `parent_id = None` marks a root node.
//! - **Media**: `media_refs` holds ordered storage keys in canonical form;
//!   legacy on-disk representations are decoded at the read boundary
//!   (see [`crate::models::media`]).
//!
//! # Examples
//!
//! ```rust
//! use sangam_core::models::TeamNode;
//!
//! // Create a root node
//! let president = TeamNode::new(
//!     Some("A. Sharma".to_string()),
//!     Some("President".to_string()),
//!     Some("Karyakarini".to_string()),
//!     None,
//! );
//!
//! // Create a child of the root
//! let secretary = TeamNode::new(
//!     Some("B. Patil".to_string()),
//!     Some("Secretary".to_string()),
//!     Some("Karyakarini".to_string()),
//!     Some(president.id.clone()),
//! );
//! assert!(!secretary.is_root());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for TeamNode operations
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),

    #[error("Invalid media reference: {0}")]
    InvalidMediaRef(String),
}

/// A single entry in the organizational team hierarchy.
///
/// # Fields
///
/// - `id`: Unique identifier (UUID), assigned at creation, immutable
/// - `name`, `role`, `samiti`: Optional free-text labels (`samiti` is the
///   organizational-group label)
/// - `parent_id`: Optional reference to the parent node; `None` marks a root.
///   There is no schema-enforced acyclicity or existence check - a dangling
///   parent makes the node an orphan, which readers tolerate.
/// - `media_refs`: Ordered storage keys for uploaded images. Order is display
///   order and is preserved end-to-end from storage to response.
/// - `created_at`: Set once at creation; the sibling ordering key
/// - `modified_at`: Bumped on every mutation
///
/// # Deletion semantics
///
/// Deleting a node does not cascade to its children - they become orphans
/// pointing at a nonexistent parent. This is a deliberate, documented
/// limitation of the data model, not a bug readers should repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamNode {
    /// Unique identifier (UUID string)
    pub id: String,

    /// Display name of the member or unit
    pub name: Option<String>,

    /// Role within the organization (e.g., "President", "Secretary")
    pub role: Option<String>,

    /// Organizational group label
    pub samiti: Option<String>,

    /// Parent node ID (None = root)
    pub parent_id: Option<String>,

    /// Ordered storage keys of uploaded images (canonical form)
    #[serde(default)]
    pub media_refs: Vec<String>,

    /// Creation timestamp (sibling ordering key)
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,
}

impl TeamNode {
    /// Create a new TeamNode with an auto-generated UUID
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use sangam_core::models::TeamNode;
    /// let node = TeamNode::new(Some("Treasurer".to_string()), None, None, None);
    /// assert!(node.is_root());
    /// assert!(node.media_refs.is_empty());
    /// ```
    pub fn new(
        name: Option<String>,
        role: Option<String>,
        samiti: Option<String>,
        parent_id: Option<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            name,
            role,
            samiti,
            parent_id,
            media_refs: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Create a new TeamNode with an explicit ID
    ///
    /// Used when the identifier is assigned externally (e.g., migrated data).
    pub fn new_with_id(
        id: String,
        name: Option<String>,
        role: Option<String>,
        samiti: Option<String>,
        parent_id: Option<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            name,
            role,
            samiti,
            parent_id,
            media_refs: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Validate node structure
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - `id` is empty
    /// - the node references itself as parent
    /// - a media reference is empty
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }

        if let Some(parent_id) = &self.parent_id {
            if parent_id == &self.id {
                return Err(ValidationError::InvalidParent(
                    "Node cannot be its own parent".to_string(),
                ));
            }
        }

        if self.media_refs.iter().any(|k| k.trim().is_empty()) {
            return Err(ValidationError::InvalidMediaRef(
                "Media reference must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if this node is a root (no parent reference)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Replace the node's media references
    pub fn set_media_refs(&mut self, keys: Vec<String>) {
        self.media_refs = keys;
        self.modified_at = Utc::now();
    }
}

/// Custom deserializer for optional fields that accepts both plain values and null
///
/// Maps three input formats to the double-Option pattern:
/// - Missing field → None (don't update)
/// - null → Some(None) (set to NULL)
/// - "value" → Some(Some("value")) (set to value)
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    // Missing field is handled by #[serde(default)] on the struct field
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial node update structure for sparse mutations
///
/// All fields are optional; only provided fields are written.
///
/// # Double-Option Pattern for Nullable Fields
///
/// `parent_id` uses a double-`Option` to distinguish three states:
///
/// - `None`: Don't change the parent
/// - `Some(None)`: Clear the parent (node becomes a root)
/// - `Some(Some(id))`: Re-parent under the specified node
///
/// # Examples
///
/// ```rust
/// # use sangam_core::models::TeamNodeUpdate;
/// // Rename only
/// let update = TeamNodeUpdate::new().with_name("New name".to_string());
///
/// // Rename and clear the parent
/// let update = TeamNodeUpdate {
///     name: Some("Detached".to_string()),
///     parent_id: Some(None),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamNodeUpdate {
    /// Update display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Update role label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Update organizational-group label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samiti: Option<String>,

    /// Update parent reference (double-Option, see struct docs)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<String>>,

    /// Replace the media references (full replacement, not append)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_refs: Option<Vec<String>>,
}

impl TeamNodeUpdate {
    /// Create a new empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Set name update
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Set role update
    pub fn with_role(mut self, role: String) -> Self {
        self.role = Some(role);
        self
    }

    /// Set samiti update
    pub fn with_samiti(mut self, samiti: String) -> Self {
        self.samiti = Some(samiti);
        self
    }

    /// Re-parent under the given node
    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Replace media references
    pub fn with_media_refs(mut self, keys: Vec<String>) -> Self {
        self.media_refs = Some(keys);
        self
    }

    /// Check if the update contains any changes
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.role.is_none()
            && self.samiti.is_none()
            && self.parent_id.is_none()
            && self.media_refs.is_none()
    }
}
