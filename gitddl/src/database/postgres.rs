//! PostgreSQL backend.

use ::postgres::{Client, NoTls};
use tracing::debug;

use super::Database;
use crate::error::GitDdlResult;

/// A PostgreSQL connection.
pub struct PostgresDatabase {
    client: Client,
}

impl PostgresDatabase {
    /// Connect using a `postgres://` URL or a libpq key/value string.
    pub fn connect(params: &str) -> GitDdlResult<Self> {
        debug!("Connecting to PostgreSQL");
        let client = Client::connect(params, NoTls)?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Database for PostgresDatabase {
    fn execute(&mut self, sql: &str) -> GitDdlResult<u64> {
        debug!(sql = %sql, "Executing statement");
        Ok(self.client.execute(sql, &[])?)
    }

    fn query_column(&mut self, sql: &str) -> GitDdlResult<Vec<String>> {
        debug!(sql = %sql, "Executing query");
        let rows = self.client.query(sql, &[])?;
        let values: Result<Vec<String>, _> = rows.iter().map(|row| row.try_get(0)).collect();
        Ok(values?)
    }

    fn table_exists(&mut self, table: &str) -> GitDdlResult<bool> {
        // Unquoted identifiers are folded to lower case by the server.
        let rows = self.client.query(
            "SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = lower($1)",
            &[&table],
        )?;
        Ok(!rows.is_empty())
    }

    fn begin(&mut self) -> GitDdlResult<()> {
        Ok(self.client.batch_execute("BEGIN")?)
    }

    fn commit(&mut self) -> GitDdlResult<()> {
        Ok(self.client.batch_execute("COMMIT")?)
    }

    fn rollback(&mut self) -> GitDdlResult<()> {
        Ok(self.client.batch_execute("ROLLBACK")?)
    }
}
