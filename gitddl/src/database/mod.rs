//! Database access.
//!
//! The engine only needs a handful of operations from a driver: run a
//! statement, read one text column, probe for a table, and manage a
//! transaction. [`Database`] captures exactly that, and [`connect`] builds
//! the right backend from a [`Dsn`].

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use tracing::debug;

use crate::config::Dsn;
use crate::error::{GitDdlError, GitDdlResult};

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresDatabase;
#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteDatabase;

/// A blocking database connection.
pub trait Database {
    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str) -> GitDdlResult<u64>;

    /// Run a query and return the first column of every row as text.
    fn query_column(&mut self, sql: &str) -> GitDdlResult<Vec<String>>;

    /// Check whether a table exists in the current schema.
    fn table_exists(&mut self, table: &str) -> GitDdlResult<bool>;

    /// Start a transaction.
    fn begin(&mut self) -> GitDdlResult<()> {
        self.execute("BEGIN").map(|_| ())
    }

    /// Commit the open transaction.
    fn commit(&mut self) -> GitDdlResult<()> {
        self.execute("COMMIT").map(|_| ())
    }

    /// Roll back the open transaction.
    fn rollback(&mut self) -> GitDdlResult<()> {
        self.execute("ROLLBACK").map(|_| ())
    }
}

impl<D: Database + ?Sized> Database for Box<D> {
    fn execute(&mut self, sql: &str) -> GitDdlResult<u64> {
        (**self).execute(sql)
    }

    fn query_column(&mut self, sql: &str) -> GitDdlResult<Vec<String>> {
        (**self).query_column(sql)
    }

    fn table_exists(&mut self, table: &str) -> GitDdlResult<bool> {
        (**self).table_exists(table)
    }

    fn begin(&mut self) -> GitDdlResult<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> GitDdlResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> GitDdlResult<()> {
        (**self).rollback()
    }
}

/// Open a connection for `dsn` and run its on-connect hook.
pub fn connect(dsn: &Dsn) -> GitDdlResult<Box<dyn Database>> {
    let mut db = open(dsn)?;
    run_on_connect(db.as_mut(), dsn)?;
    Ok(db)
}

/// Run the on-connect statements of `dsn` in order.
pub fn run_on_connect(db: &mut dyn Database, dsn: &Dsn) -> GitDdlResult<()> {
    for stmt in dsn.on_connect_statements() {
        debug!(sql = %stmt, "Running on-connect statement");
        db.execute(stmt)?;
    }
    Ok(())
}

fn open(dsn: &Dsn) -> GitDdlResult<Box<dyn Database>> {
    let driver = dsn.driver().to_ascii_lowercase();
    debug!(driver = %driver, "Opening database connection");

    match driver.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" | "sqlite3" => Ok(Box::new(SqliteDatabase::from_dsn(dsn)?)),
        #[cfg(feature = "postgres")]
        "pg" | "postgres" | "postgresql" => {
            Ok(Box::new(PostgresDatabase::connect(&dsn.postgres_params())?))
        }
        _ => Err(GitDdlError::config(format!(
            "no database backend for driver '{}' (enabled: {})",
            dsn.driver(),
            enabled_backends().join(", ")
        ))),
    }
}

/// Names of the backends compiled into this build.
pub fn enabled_backends() -> Vec<&'static str> {
    let mut backends = Vec::new();

    #[cfg(feature = "sqlite")]
    backends.push("sqlite");

    #[cfg(feature = "postgres")]
    backends.push("postgres");

    if backends.is_empty() {
        backends.push("none");
    }

    backends
}
