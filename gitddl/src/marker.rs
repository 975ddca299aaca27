//! Version marker table.
//!
//! The marker is a single-row table recording which [`SchemaVersion`] is
//! deployed. Its name is configurable and interpolated into SQL text, so it
//! is only ever constructed through [`MarkerTable::new`], which restricts it
//! to `^[A-Za-z_]+$`.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::{GitDdlError, GitDdlResult};
use crate::version::{SHA256_LEN, SchemaVersion};

/// Default marker table name.
pub const DEFAULT_VERSION_TABLE: &str = "git_ddl_version";

/// Name of the single marker column.
pub const VERSION_COLUMN: &str = "version";

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]+$").expect("static regex"));

/// Check that a marker table name is safe to interpolate into SQL.
pub fn validate_table_name(name: &str) -> GitDdlResult<()> {
    if TABLE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(GitDdlError::config(format!(
            "invalid version table name '{}': only ASCII letters and '_' are allowed",
            name
        )))
    }
}

/// A validated marker table name and the SQL that operates on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTable {
    name: String,
}

impl MarkerTable {
    /// Validate `name` and wrap it.
    pub fn new(name: impl Into<String>) -> GitDdlResult<Self> {
        let name = name.into();
        validate_table_name(&name)?;
        Ok(Self { name })
    }

    /// The table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `CREATE TABLE` for the marker.
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE TABLE {} ({} VARCHAR({}) NOT NULL)",
            self.name, VERSION_COLUMN, SHA256_LEN
        )
    }

    /// Read every marker row.
    pub fn select_sql(&self) -> String {
        format!("SELECT {} FROM {}", VERSION_COLUMN, self.name)
    }

    // Versions are validated hex, so embedding them as literals is safe.

    /// Record the initial version.
    pub fn insert_sql(&self, version: &SchemaVersion) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ('{}')",
            self.name, VERSION_COLUMN, version
        )
    }

    /// Move the marker from `from` to `to`.
    ///
    /// The `WHERE` clause makes the update a compare-and-swap: if another
    /// process moved the marker first, no row matches.
    pub fn update_sql(&self, from: &SchemaVersion, to: &SchemaVersion) -> String {
        format!(
            "UPDATE {} SET {} = '{}' WHERE {} = '{}'",
            self.name, VERSION_COLUMN, to, VERSION_COLUMN, from
        )
    }
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self {
            name: DEFAULT_VERSION_TABLE.to_string(),
        }
    }
}

/// What the marker table currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerState {
    /// The marker table does not exist.
    Absent,
    /// The table exists but has no row.
    Empty,
    /// Exactly one row.
    Present(SchemaVersion),
}

impl MarkerState {
    /// Interpret the rows returned by [`MarkerTable::select_sql`].
    pub fn from_rows(rows: Vec<String>) -> GitDdlResult<Self> {
        let mut rows = rows.into_iter();
        match (rows.next(), rows.next()) {
            (None, _) => Ok(Self::Empty),
            (Some(version), None) => Ok(Self::Present(SchemaVersion::parse(version)?)),
            (Some(_), Some(_)) => Err(GitDdlError::marker_inconsistent(format!(
                "expected exactly one row, found {}",
                2 + rows.count()
            ))),
        }
    }

    /// The deployed version, if any.
    pub fn version(&self) -> Option<&SchemaVersion> {
        match self {
            Self::Present(version) => Some(version),
            _ => None,
        }
    }
}
