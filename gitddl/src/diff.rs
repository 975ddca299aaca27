//! Schema diff adapter.
//!
//! Computing the difference between two schema files is delegated to an
//! external engine. This module hands the engine the deployed snapshot and
//! the working-tree schema file, then turns its textual output into an
//! ordered list of statements.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::dialect::Dialect;
use crate::error::{GitDdlError, GitDdlResult};
use crate::executor::{split_statements, strip_comments};
use crate::snapshot::Snapshot;

/// Inputs for one diff computation.
#[derive(Debug, Clone, Copy)]
pub struct DiffRequest<'a> {
    /// Schema file as currently deployed.
    pub source: &'a Path,
    /// Schema file the database should be brought to.
    pub target: &'a Path,
    /// Dialect of the target database.
    pub dialect: &'a Dialect,
}

impl DiffRequest<'_> {
    /// Read the deployed schema as text.
    pub fn source_sql(&self) -> GitDdlResult<String> {
        Ok(std::fs::read_to_string(self.source)?)
    }

    /// Read the target schema as text.
    pub fn target_sql(&self) -> GitDdlResult<String> {
        Ok(std::fs::read_to_string(self.target)?)
    }
}

/// A schema diff engine.
///
/// Implementations return the engine's raw output: SQL statements
/// terminated by `;`, optionally preceded by a header comment line.
pub trait DiffEngine {
    /// Produce the statements that turn `source` into `target`.
    fn diff(&self, request: &DiffRequest<'_>) -> GitDdlResult<String>;
}

impl<F> DiffEngine for F
where
    F: Fn(&DiffRequest<'_>) -> GitDdlResult<String>,
{
    fn diff(&self, request: &DiffRequest<'_>) -> GitDdlResult<String> {
        self(request)
    }
}

/// A diff engine run as an external program.
///
/// Arguments may contain the placeholders `{from}`, `{to}`, and `{dialect}`.
/// The program's standard output is taken as the diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDiffEngine {
    /// Executable to run.
    pub program: PathBuf,
    /// Argument templates.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandDiffEngine {
    /// Create an engine running `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument template.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several argument templates.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Expand the placeholders for one request.
    pub fn render_args(&self, request: &DiffRequest<'_>) -> Vec<String> {
        let from = request.source.to_string_lossy();
        let to = request.target.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{from}", &from)
                    .replace("{to}", &to)
                    .replace("{dialect}", request.dialect.as_str())
            })
            .collect()
    }
}

impl DiffEngine for CommandDiffEngine {
    fn diff(&self, request: &DiffRequest<'_>) -> GitDdlResult<String> {
        let args = self.render_args(request);
        trace!(program = %self.program.display(), ?args, "Running diff command");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| {
                GitDdlError::diff(format!(
                    "failed to run '{}': {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(GitDdlError::diff(format!(
                "'{}' exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| GitDdlError::diff(format!("diff output is not UTF-8: {}", e)))
    }
}

/// An ordered list of schema-altering statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDiff {
    statements: Vec<String>,
}

impl SchemaDiff {
    /// Build a diff from statements that are already split.
    pub fn new(statements: Vec<String>) -> Self {
        Self { statements }
    }

    /// Parse raw engine output.
    ///
    /// A leading `--` header line is dropped; the rest is split on `;`.
    /// Transaction control emitted by the engine (`BEGIN`, `COMMIT`, `END`)
    /// is dropped: the statements run inside the upgrade's own transaction.
    pub fn from_engine_output(output: &str) -> Self {
        let body = strip_header(output);
        Self {
            statements: split_statements(body)
                .into_iter()
                .filter(|stmt| !is_transaction_control(stmt))
                .map(str::to_string)
                .collect(),
        }
    }

    /// The statements in application order, without terminators.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Check if the diff contains no statements.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Render as an executable batch.
    pub fn to_sql(&self) -> String {
        self.statements.iter().map(|s| format!("{};\n", s)).collect()
    }
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn strip_header(output: &str) -> &str {
    let trimmed = output.trim_start_matches(['\r', '\n']);
    if trimmed.starts_with("--") {
        trimmed.split_once('\n').map_or("", |(_, rest)| rest)
    } else {
        trimmed
    }
}

fn is_transaction_control(statement: &str) -> bool {
    let words = strip_comments(statement)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    matches!(
        words.as_str(),
        "BEGIN"
            | "BEGIN TRANSACTION"
            | "BEGIN WORK"
            | "BEGIN DEFERRED"
            | "BEGIN DEFERRED TRANSACTION"
            | "BEGIN IMMEDIATE"
            | "BEGIN IMMEDIATE TRANSACTION"
            | "BEGIN EXCLUSIVE"
            | "BEGIN EXCLUSIVE TRANSACTION"
            | "START TRANSACTION"
            | "COMMIT"
            | "COMMIT TRANSACTION"
            | "COMMIT WORK"
            | "END"
            | "END TRANSACTION"
    )
}

/// Diff a deployed snapshot against the schema file at `target`.
///
/// The snapshot is written to a temporary file that only lives for the
/// duration of the call.
pub fn compute_diff(
    engine: &dyn DiffEngine,
    source: &Snapshot,
    target: &Path,
    dialect: &Dialect,
) -> GitDdlResult<SchemaDiff> {
    let materialized = source.materialize()?;
    let request = DiffRequest {
        source: materialized.path(),
        target,
        dialect,
    };

    debug!(
        from = %source.version().short(),
        target = %target.display(),
        dialect = %dialect,
        "Computing schema diff"
    );
    let output = engine.diff(&request)?;
    let diff = SchemaDiff::from_engine_output(&output);
    debug!(statements = diff.len(), "Schema diff computed");

    Ok(diff)
}
