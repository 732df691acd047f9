//! `SQLite` connection pooling.
//!
//! Connections come from an `r2d2` pool. Every connection gets the same
//! pragmas from the manager's init hook. An in-memory database is capped at
//! a single connection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::debug;

use crate::error::{Error, Result};

/// How long a connection waits on a locked database file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a checkout waits for a free connection.
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pool of `SQLite` connections.
pub type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;

/// A connection checked out of a [`ConnectionPool`], returned on drop.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// What the pool connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolTarget {
    /// A database file on disk.
    File(PathBuf),
    /// A private in-memory database.
    Memory,
}

impl PoolTarget {
    /// Path shown in logs and stats.
    #[must_use]
    pub fn display_path(&self) -> PathBuf {
        match self {
            Self::File(path) => path.clone(),
            Self::Memory => PathBuf::from(":memory:"),
        }
    }
}

/// Build a pool on a database file, creating parent directories as needed.
///
/// The file is opened once up front so that a bad path is reported as
/// [`Error::DatabaseOpen`] instead of a pool timeout.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created.
pub fn file_pool(path: &Path, max_size: usize) -> Result<ConnectionPool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    Connection::open(path).map_err(|source| Error::DatabaseOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let max_size = u32::try_from(max_size).unwrap_or(u32::MAX).max(1);
    debug!(
        "Building pool of {} connections to {}",
        max_size,
        path.display()
    );

    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA foreign_keys=ON; PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;",
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)
    });
    build(manager, max_size)
}

/// Build a single-connection pool on a private in-memory database.
///
/// # Errors
///
/// Returns an error if the in-memory database cannot be created.
pub fn memory_pool() -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys=ON;"));
    build(manager, 1)
}

fn build(manager: SqliteConnectionManager, max_size: u32) -> Result<ConnectionPool> {
    let pool = r2d2::Pool::builder()
        .max_size(max_size)
        .min_idle(Some(1))
        .connection_timeout(CHECKOUT_TIMEOUT)
        .build(manager)?;
    Ok(pool)
}
