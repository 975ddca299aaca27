//! SQLite backend.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use super::Database;
use crate::config::Dsn;
use crate::error::{GitDdlError, GitDdlResult};

/// Where a SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlitePath {
    /// In-memory database.
    Memory,
    /// File-based database.
    File(PathBuf),
}

impl SqlitePath {
    /// Parse the location out of a descriptor.
    ///
    /// Supported formats:
    /// - `sqlite::memory:` / `sqlite:` with `:memory:`
    /// - `sqlite://path/to/db.sqlite`
    /// - `sqlite:path/to/db.sqlite`
    /// - `dbi:SQLite:dbname=path/to/db.sqlite`
    pub fn from_dsn(dsn: &Dsn) -> GitDdlResult<Self> {
        let target = dsn.target();
        let target = target.strip_prefix("//").unwrap_or(target);
        let target = target.strip_prefix("dbname=").unwrap_or(target);
        // Drop DBI attributes and URL query parameters.
        let path = target
            .split(['?', ';'])
            .next()
            .unwrap_or_default()
            .trim();

        match path {
            "" => Err(GitDdlError::config(format!(
                "database path is required in '{}'",
                dsn.url()
            ))),
            ":memory:" => Ok(Self::Memory),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }
}

/// A SQLite connection.
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Open a database file, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> GitDdlResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            GitDdlError::sql(format!(
                "failed to open database at '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> GitDdlResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Open the database named by `dsn` (on-connect hooks are not run).
    pub fn from_dsn(dsn: &Dsn) -> GitDdlResult<Self> {
        match SqlitePath::from_dsn(dsn)? {
            SqlitePath::Memory => Self::open_in_memory(),
            SqlitePath::File(path) => Self::open(path),
        }
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Borrow the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Database for SqliteDatabase {
    fn execute(&mut self, sql: &str) -> GitDdlResult<u64> {
        debug!(sql = %sql, "Executing statement");
        let mut stmt = self.conn.prepare(sql)?;

        // PRAGMAs and the like report results through rows; drain them.
        if stmt.column_count() > 0 {
            let mut rows = stmt.query([])?;
            while rows.next()?.is_some() {}
            return Ok(0);
        }

        // sqlite3_changes() keeps the count of the last INSERT/UPDATE/DELETE,
        // so it is only read when this statement changed rows.
        let before = self.conn.total_changes();
        let affected = stmt.execute([])?;
        if self.conn.total_changes() == before {
            return Ok(0);
        }
        Ok(affected as u64)
    }

    fn query_column(&mut self, sql: &str) -> GitDdlResult<Vec<String>> {
        debug!(sql = %sql, "Executing query");
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let values: Result<Vec<_>, _> = rows.collect();
        Ok(values?)
    }

    fn table_exists(&mut self, table: &str) -> GitDdlResult<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn begin(&mut self) -> GitDdlResult<()> {
        Ok(self.conn.execute_batch("BEGIN")?)
    }

    fn commit(&mut self) -> GitDdlResult<()> {
        Ok(self.conn.execute_batch("COMMIT")?)
    }

    fn rollback(&mut self) -> GitDdlResult<()> {
        Ok(self.conn.execute_batch("ROLLBACK")?)
    }
}
