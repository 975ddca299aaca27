//! `gitddl check` command - Fail unless the database is current.

use crate::commands::Context;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the check command
pub fn run(mut ctx: Context) -> CliResult<()> {
    if ctx.ddl.check_version()? {
        output::success("Database schema is up to date");
        return Ok(());
    }

    Err(CliError::OutOfDate {
        deployed: ctx.ddl.database_version()?.to_string(),
        desired: ctx.ddl.desired_version()?.to_string(),
    })
}
