//! Configuration for a [`GitDdl`](crate::GitDdl) instance.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diff::CommandDiffEngine;
use crate::marker::DEFAULT_VERSION_TABLE;

/// Statements run right after connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OnConnect {
    /// A single statement.
    One(String),
    /// An ordered list of statements.
    Many(Vec<String>),
}

impl OnConnect {
    /// The statements in execution order.
    pub fn statements(&self) -> &[String] {
        match self {
            Self::One(stmt) => std::slice::from_ref(stmt),
            Self::Many(stmts) => stmts,
        }
    }
}

impl From<&str> for OnConnect {
    fn from(stmt: &str) -> Self {
        Self::One(stmt.to_string())
    }
}

impl From<String> for OnConnect {
    fn from(stmt: String) -> Self {
        Self::One(stmt)
    }
}

impl From<Vec<String>> for OnConnect {
    fn from(stmts: Vec<String>) -> Self {
        Self::Many(stmts)
    }
}

/// A database connection descriptor.
///
/// Accepted forms are URL style (`postgres://user@host/db`, `sqlite://app.db`,
/// `sqlite::memory:`) and DBI style (`dbi:SQLite:dbname=app.db`,
/// `dbi:Pg:dbname=app;host=db`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    url: String,
    on_connect: Option<OnConnect>,
}

impl Dsn {
    /// Create a descriptor with no on-connect hook.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            on_connect: None,
        }
    }

    /// Set the on-connect hook.
    pub fn on_connect_do(mut self, hook: impl Into<OnConnect>) -> Self {
        self.on_connect = Some(hook.into());
        self
    }

    /// The raw descriptor string.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The on-connect hook, if any.
    pub fn on_connect(&self) -> Option<&OnConnect> {
        self.on_connect.as_ref()
    }

    /// Statements to run after connecting (empty when no hook is set).
    pub fn on_connect_statements(&self) -> &[String] {
        match &self.on_connect {
            Some(hook) => hook.statements(),
            None => &[],
        }
    }

    /// The driver tag: the scheme of a URL, or the driver of a DBI string.
    pub fn driver(&self) -> &str {
        if let Some(rest) = self.url.strip_prefix("dbi:") {
            return rest.split(':').next().unwrap_or_default();
        }
        self.url.split(':').next().unwrap_or_default()
    }

    /// The part after the driver tag.
    pub(crate) fn target(&self) -> &str {
        let rest = self.url.strip_prefix("dbi:").unwrap_or(&self.url);
        rest.split_once(':').map_or("", |(_, target)| target)
    }

    /// Connection parameters for a PostgreSQL client.
    ///
    /// URLs are passed through unchanged. DBI attributes become a libpq
    /// key/value string: `dbi:Pg:dbname=app;host=db` gives `dbname=app host=db`.
    pub fn postgres_params(&self) -> String {
        if !self.url.starts_with("dbi:") {
            return self.url.clone();
        }
        self.target()
            .split(';')
            .map(str::trim)
            .filter(|attr| !attr.is_empty())
            .map(|attr| {
                let (key, value) = match attr.split_once('=') {
                    Some((key, value)) => (key.trim(), value.trim()),
                    None => ("dbname", attr),
                };
                let key = match key {
                    "database" | "db" => "dbname",
                    other => other,
                };
                format!("{}={}", key, quote_param(value))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_param(value: &str) -> String {
    let needs_quotes =
        value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Configuration for schema deployment.
#[derive(Debug, Clone)]
pub struct GitDdlConfig {
    /// Path to the checked-out repository.
    pub work_tree: PathBuf,
    /// Schema file, relative to `work_tree`.
    pub ddl_file: PathBuf,
    /// Database connection descriptor.
    pub dsn: Dsn,
    /// Marker table name.
    pub version_table: String,
    /// External diff command, if configured.
    pub diff_command: Option<CommandDiffEngine>,
    /// Driver names allowed to pass through as an unrecognized dialect.
    pub allowed_dialects: Vec<String>,
}

impl GitDdlConfig {
    /// Create a new configuration.
    pub fn new(work_tree: impl Into<PathBuf>, ddl_file: impl Into<PathBuf>, dsn: Dsn) -> Self {
        Self {
            work_tree: work_tree.into(),
            ddl_file: ddl_file.into(),
            dsn,
            version_table: DEFAULT_VERSION_TABLE.to_string(),
            diff_command: None,
            allowed_dialects: Vec::new(),
        }
    }

    /// Set the marker table name.
    pub fn version_table(mut self, table: impl Into<String>) -> Self {
        self.version_table = table.into();
        self
    }

    /// Set the external diff command.
    pub fn diff_command(mut self, command: CommandDiffEngine) -> Self {
        self.diff_command = Some(command);
        self
    }

    /// Allow an unrecognized driver name to be passed to the diff engine.
    pub fn allow_dialect(mut self, name: impl Into<String>) -> Self {
        self.allowed_dialects.push(name.into());
        self
    }

    /// Absolute (or work-tree relative) path of the schema file on disk.
    pub fn ddl_path(&self) -> PathBuf {
        self.work_tree.join(&self.ddl_file)
    }

    /// The schema file path relative to the work tree.
    pub fn ddl_file(&self) -> &Path {
        &self.ddl_file
    }
}
