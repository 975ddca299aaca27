//! `gitddl deploy` command - Create the schema on an empty database.

use crate::commands::Context;
use crate::error::CliResult;
use crate::output;

/// Run the deploy command
pub fn run(mut ctx: Context) -> CliResult<()> {
    output::header("Deploy Schema");
    ctx.print_target();

    output::step(1, 2, "Resolving schema version...");
    let version = ctx.ddl.desired_version()?;
    output::list_item(&format!("Latest schema commit: {}", version));

    output::step(2, 2, "Applying schema...");
    let report = ctx.ddl.deploy()?;

    output::newline();
    output::success(&report.summary());
    Ok(())
}
