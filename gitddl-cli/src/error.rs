//! CLI error types and result alias.

use gitddl::GitDdlError;
use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(gitddl::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(gitddl::config))]
    Config(String),

    /// Error from the deployment engine
    #[error(transparent)]
    #[diagnostic(code(gitddl::engine))]
    Engine(#[from] GitDdlError),

    /// The database does not match the latest schema commit
    #[error("Database is at {deployed}, schema is at {desired}")]
    #[diagnostic(
        code(gitddl::out_of_date),
        help("run `gitddl upgrade` to apply the schema changes")
    )]
    OutOfDate {
        /// Version recorded in the database
        deployed: String,
        /// Latest schema commit
        desired: String,
    },

    /// The user declined a confirmation prompt
    #[error("Aborted")]
    #[diagnostic(code(gitddl::aborted))]
    Aborted,
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::OutOfDate { .. } => 2,
            _ => 1,
        }
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        CliError::Config(format!("Failed to serialize TOML: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Config(format!("Failed to serialize JSON: {}", err))
    }
}
