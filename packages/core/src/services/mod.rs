//! Business Services
//!
//! This module contains the core business logic services:
//!
//! - `TeamService` - node mutation with safe media replacement, tree reads
//! - `TreeBuilder` - recursive tree reconstruction with media resolution
//! - `MediaResolver` - storage-key to display-URL resolution
//!
//! Services coordinate between the database layer, object storage, and
//! application logic.

pub mod error;
pub mod media_resolver;
pub mod team_service;
pub mod tree_builder;


pub use error::TeamServiceError;
pub use media_resolver::MediaResolver;
pub use team_service::{CreateMemberParams, MediaUpload, TeamService};
pub use tree_builder::{TreeBuilder, TreeBuilderConfig, TreeNode};
