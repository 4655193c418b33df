//! Database Layer
//!
//! This module handles all database interactions using libsql/Turso:
//!
//! - Database initialization and connection management
//! - Flat `team_nodes` storage with `parent_id` back-references
//! - Legacy-tolerant media column decoding on the read path
//!
//! # Architecture
//!
//! `DatabaseService` owns the connection and raw SQL; the `TeamStore`
//! trait is the seam the service layer consumes, with `TursoStore` as the
//! libsql-backed implementation.

mod database;
mod error;
mod team_store;

pub use database::{DatabaseService, DbNodeParams};
pub use error::DatabaseError;
pub use team_store::{TeamStore, TursoStore};
