//! Error types for schema deployment and upgrades.

use std::path::PathBuf;

use thiserror::Error;

use crate::version::SchemaVersion;

/// Result type alias for gitddl operations.
pub type GitDdlResult<T> = Result<T, GitDdlError>;

/// Errors that can occur while reconciling or migrating a database.
#[derive(Debug, Error)]
pub enum GitDdlError {
    /// Invalid configuration (bad marker table name, unknown driver, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The database has no readable version marker.
    #[error("Database is not deployed: {0}")]
    DeploymentMissing(String),

    /// `deploy` was called on a database that already carries a marker.
    #[error("Database is already deployed at version {0}")]
    AlreadyDeployed(SchemaVersion),

    /// The schema file does not exist at the requested version.
    #[error("'{}' not found at version {version}", path.display())]
    NotFound {
        /// Version that was looked up.
        version: SchemaVersion,
        /// Path relative to the work tree.
        path: PathBuf,
    },

    /// A diff was requested while the database already matches history.
    #[error("No difference expected: database is already at version {0}")]
    NoDifferenceExpected(SchemaVersion),

    /// The schema file has never been committed.
    #[error("'{}' has no version control history", .0.display())]
    NoHistory(PathBuf),

    /// Database driver error.
    #[error("SQL error: {0}")]
    Sql(String),

    /// A statement in a batch failed.
    #[error("Statement {index} failed: {message}\n  {statement}")]
    Statement {
        /// 1-based position within the batch.
        index: usize,
        /// The statement text.
        statement: String,
        /// Driver message.
        message: String,
    },

    /// The marker table does not hold exactly one row.
    #[error("Version marker is inconsistent: {0}")]
    MarkerInconsistent(String),

    /// A string that is not a valid identity token.
    #[error("Invalid schema version '{0}'")]
    InvalidVersion(String),

    /// Version control command failure.
    #[error("Version control error: {0}")]
    Vcs(String),

    /// Diff engine failure.
    #[error("Diff engine error: {0}")]
    Diff(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitDdlError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a deployment-missing error.
    pub fn deployment_missing(msg: impl Into<String>) -> Self {
        Self::DeploymentMissing(msg.into())
    }

    /// Create a SQL error.
    pub fn sql(msg: impl Into<String>) -> Self {
        Self::Sql(msg.into())
    }

    /// Create a marker inconsistency error.
    pub fn marker_inconsistent(msg: impl Into<String>) -> Self {
        Self::MarkerInconsistent(msg.into())
    }

    /// Create a version control error.
    pub fn vcs(msg: impl Into<String>) -> Self {
        Self::Vcs(msg.into())
    }

    /// Create a diff engine error.
    pub fn diff(msg: impl Into<String>) -> Self {
        Self::Diff(msg.into())
    }

    /// Check if this error means "no marker yet" rather than a failure.
    pub fn is_not_deployed(&self) -> bool {
        matches!(self, Self::DeploymentMissing(_))
    }

    /// Check if this error originated in the database driver.
    pub fn is_sql(&self) -> bool {
        matches!(self, Self::Sql(_) | Self::Statement { .. })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for GitDdlError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sql(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<postgres::Error> for GitDdlError {
    fn from(err: postgres::Error) -> Self {
        Self::Sql(err.to_string())
    }
}
