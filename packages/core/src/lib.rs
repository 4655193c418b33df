//! Sangam Backend Core
//!
//! This crate provides the core data management and services for the
//! Sangam community-organization backend: the team hierarchy with its
//! recursive tree reconstruction, and media handling backed by object
//! storage.
//!
//! # Architecture
//!
//! - **Flat hierarchy records**: team nodes persist flat with `parent_id`
//!   back-references; the nested tree is rebuilt at read time
//! - **libsql/Turso**: embedded SQLite-compatible database
//! - **Legacy-tolerant media decoding**: every historical representation of
//!   a stored media reference normalizes at the read boundary
//! - **Safe media replacement**: upload new → persist → best-effort delete
//!   old, so records never reference deleted-but-unreplaced objects
//!
//! # Modules
//!
//! - [`models`] - Data structures (TeamNode, updates, media decoding)
//! - [`db`] - Database layer with libsql integration
//! - [`storage`] - Object storage seam and implementations
//! - [`services`] - Business services (TeamService, TreeBuilder, resolver)
//! - [`config`] - Environment-driven configuration

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod storage;

// Re-export commonly used types
pub use config::{CoreConfig, StorageConfig, TeamConfig};
pub use db::{DatabaseService, TeamStore, TursoStore};
pub use models::{TeamNode, TeamNodeUpdate};
pub use services::{
    CreateMemberParams, MediaResolver, MediaUpload, TeamService, TeamServiceError, TreeBuilder,
    TreeBuilderConfig, TreeNode,
};
pub use storage::{BucketClient, MediaAccess, MemoryStore, ObjectStore, StorageError};
