//! Data Models
//!
//! Core data structures for the team hierarchy:
//!
//! - [`TeamNode`] - a flat hierarchy record with a `parent_id` back-reference
//! - [`TeamNodeUpdate`] - sparse update struct (double-Option nullable fields)
//! - [`media`] - decoding of legacy stored media representations

pub mod media;
pub mod team_node;

pub use media::{normalize_stored_value, StoredMediaValue};
pub use team_node::{TeamNode, TeamNodeUpdate, ValidationError};
