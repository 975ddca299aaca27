//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use gitddl::{
    Database, DiffRequest, Dsn, GitDdl, GitDdlConfig, GitDdlError, GitDdlResult, SchemaVersion,
    SqliteDatabase, VersionControl,
};
use tempfile::TempDir;

pub const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const C: &str = "cccccccccccccccccccccccccccccccccccccccc";

pub const SCHEMA_FILE: &str = "schema.sql";

pub fn v(s: &str) -> SchemaVersion {
    SchemaVersion::parse(s).expect("valid test version")
}

/// An in-memory, append-only history of file contents.
///
/// Clones share the same history, so a test can keep committing after the
/// engine took its handle.
#[derive(Clone, Default)]
pub struct MemoryHistory {
    commits: Rc<RefCell<Vec<(SchemaVersion, PathBuf, Vec<u8>)>>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&self, version: &str, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.commits
            .borrow_mut()
            .push((v(version), path.into(), content.into()));
    }
}

impl VersionControl for MemoryHistory {
    fn latest_commit_touching(&self, path: &Path) -> GitDdlResult<Option<SchemaVersion>> {
        Ok(self
            .commits
            .borrow()
            .iter()
            .rev()
            .find(|(_, p, _)| p == path)
            .map(|(version, _, _)| version.clone()))
    }

    fn read_blob(&self, version: &SchemaVersion, path: &Path) -> GitDdlResult<Vec<u8>> {
        let commits = self.commits.borrow();
        let not_found = || GitDdlError::NotFound {
            version: version.clone(),
            path: path.to_path_buf(),
        };

        let at = commits
            .iter()
            .position(|(v, _, _)| v == version)
            .ok_or_else(not_found)?;
        commits[..=at]
            .iter()
            .rev()
            .find(|(_, p, _)| p == path)
            .map(|(_, _, bytes)| bytes.clone())
            .ok_or_else(not_found)
    }
}

/// Counts every call that reaches the database.
pub struct RecordingDatabase<D> {
    inner: D,
    calls: Rc<Cell<usize>>,
}

impl<D> RecordingDatabase<D> {
    pub fn new(inner: D) -> (Self, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Self {
                inner,
                calls: Rc::clone(&calls),
            },
            calls,
        )
    }

    fn record(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl<D: Database> Database for RecordingDatabase<D> {
    fn execute(&mut self, sql: &str) -> GitDdlResult<u64> {
        self.record();
        self.inner.execute(sql)
    }

    fn query_column(&mut self, sql: &str) -> GitDdlResult<Vec<String>> {
        self.record();
        self.inner.query_column(sql)
    }

    fn table_exists(&mut self, table: &str) -> GitDdlResult<bool> {
        self.record();
        self.inner.table_exists(table)
    }

    fn begin(&mut self) -> GitDdlResult<()> {
        self.record();
        self.inner.begin()
    }

    fn commit(&mut self) -> GitDdlResult<()> {
        self.record();
        self.inner.commit()
    }

    fn rollback(&mut self) -> GitDdlResult<()> {
        self.record();
        self.inner.rollback()
    }
}

/// Parse single-line `CREATE TABLE name (col TYPE, ...);` statements.
fn tables(sql: &str) -> Vec<(String, Vec<String>)> {
    sql.split(';')
        .filter_map(|stmt| {
            let stmt = stmt.trim();
            let rest = stmt.strip_prefix("CREATE TABLE ")?;
            let (name, cols) = rest.split_once('(')?;
            let cols = cols.trim_end().strip_suffix(')')?;
            Some((
                name.trim().to_string(),
                cols.split(',').map(|c| c.trim().to_string()).collect(),
            ))
        })
        .collect()
}

/// A diff engine that only knows how to add columns.
pub fn add_columns(request: &DiffRequest<'_>) -> GitDdlResult<String> {
    let source = tables(&request.source_sql()?);
    let target = tables(&request.target_sql()?);

    let mut out = format!("-- {} diff\n", request.dialect);
    for (table, cols) in &target {
        let existing = source
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, cols)| cols.as_slice())
            .unwrap_or_default();
        for col in cols.iter().filter(|c| !existing.contains(c)) {
            out.push_str(&format!("ALTER TABLE {} ADD COLUMN {};\n", table, col));
        }
    }
    Ok(out)
}

/// A diff engine whose second statement always fails.
pub fn half_broken(request: &DiffRequest<'_>) -> GitDdlResult<String> {
    let mut out = add_columns(request)?;
    out.push_str("ALTER TABLE no_such_table ADD COLUMN x INT;\n");
    Ok(out)
}

/// A diff engine that wraps its output in its own transaction.
pub fn self_wrapped(request: &DiffRequest<'_>) -> GitDdlResult<String> {
    let out = add_columns(request)?;
    let body = out.split_once('\n').map_or("", |(_, rest)| rest);
    Ok(format!("-- wrapped diff\nBEGIN TRANSACTION;\n{}COMMIT;\n", body))
}

/// A temporary work tree backed by [`MemoryHistory`] and a SQLite file.
pub struct Workspace {
    pub dir: TempDir,
    pub history: MemoryHistory,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
            history: MemoryHistory::new(),
        }
    }

    /// Write the schema file and record it as `version`.
    pub fn commit(&self, version: &str, content: &str) {
        std::fs::write(self.dir.path().join(SCHEMA_FILE), content).expect("write schema");
        self.history.commit(version, SCHEMA_FILE, content);
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("app.db")
    }

    pub fn config(&self) -> GitDdlConfig {
        let dsn = Dsn::new(format!("sqlite://{}", self.db_path().display()));
        GitDdlConfig::new(self.dir.path(), SCHEMA_FILE, dsn)
    }

    /// An engine connected through the DSN, using the in-memory history.
    pub fn engine(&self) -> GitDdl {
        self.engine_with(self.config())
    }

    pub fn engine_with(&self, config: GitDdlConfig) -> GitDdl {
        GitDdl::new(config)
            .expect("valid config")
            .with_repository(self.history.clone())
            .with_diff_engine(add_columns)
    }

    /// A second connection for inspecting the database.
    pub fn inspect(&self) -> SqliteDatabase {
        SqliteDatabase::open(self.db_path()).expect("open database")
    }

    pub fn columns(&self, table: &str) -> Vec<String> {
        self.inspect()
            .query_column(&format!(
                "SELECT name FROM pragma_table_info('{}') ORDER BY cid",
                table
            ))
            .expect("read columns")
    }
}
