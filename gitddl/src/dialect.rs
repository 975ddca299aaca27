//! SQL dialect selection for the diff engine.

use std::fmt;

use serde::Serialize;

use crate::error::{GitDdlError, GitDdlResult};

/// The SQL dialect handed to the diff engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Dialect {
    /// MySQL / MariaDB.
    MySql,
    /// PostgreSQL.
    PostgreSql,
    /// SQLite.
    Sqlite,
    /// Any other driver, passed through verbatim.
    Other(String),
}

impl Dialect {
    /// Map a driver tag onto a dialect.
    ///
    /// Matching is case-insensitive; unknown tags keep their original spelling.
    pub fn from_driver(driver: &str) -> Self {
        match driver.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Self::MySql,
            "pg" | "postgres" | "postgresql" => Self::PostgreSql,
            "sqlite" | "sqlite3" => Self::Sqlite,
            _ => Self::Other(driver.to_string()),
        }
    }

    /// Resolve a driver tag, refusing unknown dialects unless allow-listed.
    pub fn resolve(driver: &str, allowed: &[String]) -> GitDdlResult<Self> {
        let dialect = Self::from_driver(driver);
        if let Self::Other(name) = &dialect {
            if !allowed.iter().any(|a| a.eq_ignore_ascii_case(name)) {
                return Err(GitDdlError::config(format!(
                    "driver '{}' has no known diff dialect; add it to allowed_dialects to pass it through",
                    name
                )));
            }
        }
        Ok(dialect)
    }

    /// The name the diff engine expects.
    pub fn as_str(&self) -> &str {
        match self {
            Self::MySql => "MySQL",
            Self::PostgreSql => "PostgreSQL",
            Self::Sqlite => "SQLite",
            Self::Other(name) => name,
        }
    }

    /// Whether this dialect is one of the built-in mappings.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
