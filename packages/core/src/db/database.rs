//! Database Connection Management
//!
//! This module provides the core database connection and initialization
//! functionality using libsql/Turso for team hierarchy storage.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf, or `:memory:` for tests
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **No parent foreign key**: `parent_id` intentionally carries no
//!   constraint - dangling parents are representable, and deleting a node
//!   never cascades to its children
//! - **Legacy media column**: `media_refs` may contain canonical JSON-array
//!   text, bare-path text, base64 text, or BLOBs; readers decode all forms
//!
//! # Database Connection Patterns
//!
//! Always use `connect_with_timeout()` in async functions to avoid SQLite
//! thread-safety violations when the Tokio runtime moves futures between
//! threads. The 5-second busy timeout allows concurrent operations to wait
//! and retry instead of failing immediately with `SQLITE_BUSY` errors.

use crate::db::error::DatabaseError;
use libsql::Builder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Database service for managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use sangam_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db_service = DatabaseService::new(PathBuf::from("./data/sangam.db")).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<libsql::Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

/// Parameters for node insertion/upsert (avoids too-many-arguments lint)
pub struct DbNodeParams<'a> {
    pub id: &'a str,
    pub name: Option<&'a str>,
    pub role: Option<&'a str>,
    pub samiti: Option<&'a str>,
    pub parent_id: Option<&'a str>,
    /// Canonical JSON array of storage keys
    pub media_refs: &'a str,
    /// RFC3339 timestamp
    pub created_at: &'a str,
    /// RFC3339 timestamp
    pub modified_at: &'a str,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Enable SQLite features (WAL mode, busy timeout)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        // Track whether this is a fresh file so schema init can flush the
        // WAL before anything else opens the database.
        let is_new_database = !db_path.exists();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema(is_new_database).await?;
        info!(path = %service.db_path.display(), "Database ready");

        Ok(service)
    }

    /// Create a DatabaseService backed by an in-memory database
    ///
    /// All connections handed out by this service share the same in-memory
    /// database, which makes it suitable for tests.
    pub async fn new_in_memory() -> Result<Self, DatabaseError> {
        // A bare ":memory:" local database gives every connection its own
        // private database, so the schema created during init is invisible
        // to the connections handed out later. Use a named shared-cache
        // in-memory database so all connections from this handle see the
        // same tables. The unique name keeps concurrent test instances
        // isolated from one another.
        let db_path = PathBuf::from(format!(
            "file:sangam-mem-{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4()
        ));

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        // A shared-cache in-memory database only lives while at least one
        // connection to it is open; once the last connection closes the
        // tables vanish. Each db method opens and drops its own connection,
        // so without an anchor the schema would disappear between calls.
        // Hold one connection open for the process lifetime to keep the
        // backing memory alive for every connection this handle hands out.
        let keepalive = service.connect()?;
        std::mem::forget(keepalive);

        service.initialize_schema(false).await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of
    /// execute(). This helper encapsulates that pattern.
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Creates the table and indexes using CREATE TABLE IF NOT EXISTS,
    /// ensuring idempotent initialization (safe to call multiple times).
    ///
    /// # Schema
    ///
    /// - `team_nodes` table: flat hierarchy records
    /// - Indexes: parent_id (child queries), created_at (sibling ordering)
    ///
    /// `parent_id` has no foreign key on purpose: the hierarchy tolerates
    /// dangling parents, and deleting a node must not cascade.
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // Enable WAL mode for better concurrency
        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        // Set busy timeout to 5 seconds (5000ms)
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;

        // media_refs is declared TEXT but historically also holds bare
        // paths, base64 text, and BLOBs; SQLite's type affinity keeps all
        // of them readable.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS team_nodes (
                id TEXT PRIMARY KEY,
                name TEXT,
                role TEXT,
                samiti TEXT,
                parent_id TEXT,
                media_refs TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                modified_at TEXT NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create team_nodes table: {}", e))
        })?;

        // Index on parent_id (child queries)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_team_nodes_parent ON team_nodes(parent_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_team_nodes_parent': {}",
                e
            ))
        })?;

        // Index on created_at (sibling ordering)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_team_nodes_created ON team_nodes(created_at)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_team_nodes_created': {}",
                e
            ))
        })?;

        // Force a WAL checkpoint only for newly created database files.
        // This prevents races where rapid database swaps in tests cause
        // "no such table" errors because WAL entries were not yet flushed.
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Get a plain connection to the database
    ///
    /// Use only in single-threaded, synchronous contexts where the
    /// connection will not be used across await points. Most code should
    /// call [`DatabaseService::connect_with_timeout`] instead.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db
            .connect()
            .map_err(|e| DatabaseError::connection_failed(self.db_path.clone(), e))
    }

    /// Get a connection with the busy timeout applied
    ///
    /// Always use this in async functions: the busy timeout lets concurrent
    /// operations wait and retry instead of failing with `SQLITE_BUSY`.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;

        Ok(conn)
    }

    //
    // TEAM NODE OPERATIONS
    // SQL logic for hierarchy records. These methods are wrapped by the
    // TeamStore trait implementation, which owns row-to-model conversion.
    //

    /// Insert or update a node (create-or-replace by id)
    ///
    /// `created_at` is preserved on conflict; everything else is replaced.
    /// `media_refs` must already be the canonical JSON-array form.
    pub async fn db_upsert_node(&self, params: DbNodeParams<'_>) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO team_nodes (id, name, role, samiti, parent_id, media_refs, created_at, modified_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 role = excluded.role,
                 samiti = excluded.samiti,
                 parent_id = excluded.parent_id,
                 media_refs = excluded.media_refs,
                 modified_at = excluded.modified_at",
            (
                params.id,
                params.name,
                params.role,
                params.samiti,
                params.parent_id,
                params.media_refs,
                params.created_at,
                params.modified_at,
            ),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to upsert node: {}", e)))?;

        Ok(())
    }

    /// Retrieve a single node by ID
    ///
    /// # Returns
    ///
    /// * `Ok(Some(row))` - Node found, returns the raw libsql Row
    /// * `Ok(None)` - Node not found (not an error)
    /// * `Err(DatabaseError)` - Query execution failed
    pub async fn db_get_node(&self, id: &str) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, name, role, samiti, parent_id, media_refs, created_at, modified_at
                 FROM team_nodes WHERE id = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_node query: {}", e))
            })?;

        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_node query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// Retrieve all children of a parent, ordered by creation time ascending
    ///
    /// The `id` tiebreak keeps the order fully deterministic when two
    /// siblings share a timestamp.
    pub async fn db_get_children(&self, parent_id: &str) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, name, role, samiti, parent_id, media_refs, created_at, modified_at
                 FROM team_nodes WHERE parent_id = ?
                 ORDER BY created_at ASC, id ASC",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_children query: {}", e))
            })?;

        stmt.query([parent_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_children query: {}", e))
        })
    }

    /// Update a node's mutable fields (full-row write)
    ///
    /// # Returns
    ///
    /// Number of rows affected (0 = node didn't exist)
    pub async fn db_update_node(&self, params: DbNodeParams<'_>) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let rows_affected = conn
            .execute(
                "UPDATE team_nodes
                 SET name = ?, role = ?, samiti = ?, parent_id = ?, media_refs = ?, modified_at = ?
                 WHERE id = ?",
                (
                    params.name,
                    params.role,
                    params.samiti,
                    params.parent_id,
                    params.media_refs,
                    params.modified_at,
                    params.id,
                ),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to update node: {}", e)))?;

        Ok(rows_affected)
    }

    /// Clear a node's parent reference (the node becomes a root)
    ///
    /// # Returns
    ///
    /// Number of rows affected (0 = node didn't exist)
    pub async fn db_detach_node(
        &self,
        id: &str,
        modified_at: &str,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let rows_affected = conn
            .execute(
                "UPDATE team_nodes SET parent_id = NULL, modified_at = ? WHERE id = ?",
                (modified_at, id),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to detach node: {}", e)))?;

        Ok(rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_creation() {
        let db = DatabaseService::new_in_memory().await;
        assert!(db.is_ok());
    }

    #[tokio::test]
    async fn test_schema_initialization() {
        let db = DatabaseService::new_in_memory().await.unwrap();
        let conn = db.connect_with_timeout().await.unwrap();

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name='team_nodes'")
            .await
            .unwrap();
        let mut rows = stmt.query(()).await.unwrap();

        assert!(rows.next().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_indexes_created() {
        let db = DatabaseService::new_in_memory().await.unwrap();
        let conn = db.connect_with_timeout().await.unwrap();

        for index in ["idx_team_nodes_parent", "idx_team_nodes_created"] {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name=?")
                .await
                .unwrap();
            let mut rows = stmt.query([index]).await.unwrap();
            assert!(
                rows.next().await.unwrap().is_some(),
                "missing index {}",
                index
            );
        }
    }

    #[tokio::test]
    async fn test_file_database_creation() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("sangam.db");

        let db = DatabaseService::new(db_path.clone()).await.unwrap();
        assert_eq!(db.db_path, db_path);
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_idempotent_initialization() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("sangam.db");

        let first = DatabaseService::new(db_path.clone()).await;
        assert!(first.is_ok());

        // Reopening the same file must not fail or clobber the schema
        let second = DatabaseService::new(db_path).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_upsert_preserves_created_at() {
        let db = DatabaseService::new_in_memory().await.unwrap();

        let params = DbNodeParams {
            id: "n-1",
            name: Some("First"),
            role: None,
            samiti: None,
            parent_id: None,
            media_refs: "[]",
            created_at: "2025-01-01T00:00:00.000000Z",
            modified_at: "2025-01-01T00:00:00.000000Z",
        };
        db.db_upsert_node(params).await.unwrap();

        // Upsert with a different created_at: the original must survive
        let params = DbNodeParams {
            id: "n-1",
            name: Some("Renamed"),
            role: None,
            samiti: None,
            parent_id: None,
            media_refs: "[]",
            created_at: "2030-01-01T00:00:00.000000Z",
            modified_at: "2025-02-01T00:00:00.000000Z",
        };
        db.db_upsert_node(params).await.unwrap();

        let row = db.db_get_node("n-1").await.unwrap().unwrap();
        let name: String = row.get(1).unwrap();
        let created_at: String = row.get(6).unwrap();

        assert_eq!(name, "Renamed");
        assert_eq!(created_at, "2025-01-01T00:00:00.000000Z");
    }

    #[tokio::test]
    async fn test_detach_missing_node_affects_zero_rows() {
        let db = DatabaseService::new_in_memory().await.unwrap();
        let affected = db
            .db_detach_node("missing", "2025-01-01T00:00:00.000000Z")
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }
}
