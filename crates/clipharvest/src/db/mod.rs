//! SQLite persistence for jobs, the keyword pool and search history.
//!
//! One connection per process, shared by the queue's workers, its result
//! collector and the keyword pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;

use crate::config::Config;

pub mod error;
pub mod history_repo;
pub mod job_repo;
pub mod keyword_repo;
pub mod migrations;

pub use error::DatabaseError;

const DATABASE_FILE: &str = "clipharvest.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle on the clipharvest database. Clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    schema_version: u32,
}

impl Database {
    /// Opens (or creates) the database file, creating parent directories,
    /// and brings the schema up to date.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Self::migrate(conn)?;

        log::info!(
            "Database opened at {} (schema v{})",
            path.display(),
            db.schema_version
        );
        Ok(db)
    }

    /// Opens the file named by `database_path`, or the per-user default.
    pub fn open_for_config(config: &Config) -> Result<Self, DatabaseError> {
        Self::open(&resolve_database_path(config))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::migrate(conn)
    }

    fn migrate(conn: Connection) -> Result<Self, DatabaseError> {
        let schema_version = migrations::run_all(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            schema_version,
        })
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }
}

/// `~/.clipharvest/data/clipharvest.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".clipharvest").join("data").join(DATABASE_FILE))
}

/// The configured path, else the per-user default, else `clipharvest.db` in
/// the working directory.
pub fn resolve_database_path(config: &Config) -> PathBuf {
    config
        .database_path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(default_database_path)
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_is_fully_migrated() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version(), 3);
    }

    #[test]
    fn test_open_file_creates_parents_and_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jobs.db");
        let db = Database::open(&path).unwrap();
        db.with_conn(|conn| {
            let mode: String = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))?;
            assert_eq!(mode.to_lowercase(), "wal");
            Ok(())
        })
        .unwrap();
        assert!(path.exists());

        drop(db);
        assert_eq!(Database::open(&path).unwrap().schema_version(), 3);
    }

    #[test]
    fn test_resolve_database_path() {
        let mut config = Config::default();
        config.database_path = Some("/srv/clipharvest/state.db".to_string());
        assert_eq!(
            resolve_database_path(&config),
            PathBuf::from("/srv/clipharvest/state.db")
        );

        config.database_path = Some("  ".to_string());
        assert!(resolve_database_path(&config).ends_with(DATABASE_FILE));

        config.database_path = None;
        assert!(resolve_database_path(&config).ends_with(DATABASE_FILE));
    }

    #[test]
    fn test_open_for_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database_path = Some(dir.path().join("c.db").to_string_lossy().into_owned());
        let db = Database::open_for_config(&config).unwrap();
        let shared = db.clone();
        shared
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO search_history (keyword, searched_at) VALUES ('cats', 'x')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        let count: u32 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM search_history", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }
}
