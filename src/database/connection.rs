//! SQLite connection management for the local session database.

use rusqlite::Connection;
use std::path::Path;

use super::migrations;
use crate::platform;

/// File name of the session database inside the platform data dir.
pub const DATABASE_FILE: &str = "linkshelf.db";

/// Owns a `rusqlite::Connection` with all migrations applied.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database at `path` and runs migrations.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Opens the database in the platform data directory, creating the
    /// directory if needed.
    pub fn open_default() -> Result<Self, rusqlite::Error> {
        let dir = platform::get_data_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "could not create data directory");
        }
        Self::open(dir.join(DATABASE_FILE))
    }

    /// Opens an in-memory database; discarded on drop.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        migrations::run_all(&conn)?;
        Ok(Self { conn })
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
