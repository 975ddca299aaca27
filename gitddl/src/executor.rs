//! Statement batch execution.

use tracing::{debug, warn};

use crate::database::Database;
use crate::error::{GitDdlError, GitDdlResult};
use crate::marker::MarkerTable;
use crate::version::SchemaVersion;

/// Split a batch on `;`, dropping fragments that are blank or hold only
/// comments.
///
/// The split is purely textual: a `;` inside a string literal or a
/// procedure body also ends a statement.
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !strip_comments(s).trim().is_empty())
        .collect()
}

/// Remove `--` line comments and `/* */` block comments.
///
/// Quotes are not tracked, so comment markers inside string literals are
/// removed too. Only use the result to classify a statement.
pub(crate) fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    loop {
        let line = rest.find("--");
        let block = rest.find("/*");
        let (start, is_line) = match (line, block) {
            (Some(l), Some(b)) if b < l => (b, false),
            (Some(l), _) => (l, true),
            (None, Some(b)) => (b, false),
            (None, None) => {
                out.push_str(rest);
                return out;
            }
        };
        out.push_str(&rest[..start]);
        out.push(' ');
        let after = &rest[start + 2..];
        rest = if is_line {
            after.find('\n').map_or("", |end| &after[end..])
        } else {
            after.find("*/").map_or("", |end| &after[end + 2..])
        };
    }
}

/// Execute every statement of a batch in order.
///
/// Stops at the first failure. Statements already executed stay applied
/// unless the caller runs this inside [`transaction`].
pub fn execute_statements(db: &mut dyn Database, sql: &str) -> GitDdlResult<usize> {
    let statements = split_statements(sql);
    for (i, stmt) in statements.iter().enumerate() {
        debug!(index = i + 1, sql = %stmt, "Applying statement");
        db.execute(stmt).map_err(|e| GitDdlError::Statement {
            index: i + 1,
            statement: stmt.to_string(),
            message: driver_message(e),
        })?;
    }
    Ok(statements.len())
}

/// Execute a batch atomically: either every statement applies or none does.
pub fn apply_batch(db: &mut dyn Database, sql: &str) -> GitDdlResult<usize> {
    transaction(db, |db| execute_statements(db, sql))
}

/// Run `f` inside a transaction.
///
/// Commits when `f` succeeds and rolls back when it fails. A failed
/// rollback is logged; the error from `f` is the one returned.
pub fn transaction<T, F>(db: &mut dyn Database, f: F) -> GitDdlResult<T>
where
    F: FnOnce(&mut dyn Database) -> GitDdlResult<T>,
{
    db.begin()?;
    match f(&mut *db) {
        Ok(value) => {
            db.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = db.rollback() {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Move the marker from `from` to `to`, requiring exactly one row to change.
pub fn update_marker(
    db: &mut dyn Database,
    table: &MarkerTable,
    from: &SchemaVersion,
    to: &SchemaVersion,
) -> GitDdlResult<()> {
    let affected = db.execute(&table.update_sql(from, to))?;
    if affected != 1 {
        return Err(GitDdlError::marker_inconsistent(format!(
            "updating {} from {} to {} affected {} rows, expected 1",
            table.name(),
            from.short(),
            to.short(),
            affected
        )));
    }
    Ok(())
}

fn driver_message(err: GitDdlError) -> String {
    match err {
        GitDdlError::Sql(msg) => msg,
        other => other.to_string(),
    }
}
