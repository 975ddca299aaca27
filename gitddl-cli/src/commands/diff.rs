//! `gitddl diff` command - Print the statements an upgrade would run.

use crate::cli::DiffArgs;
use crate::commands::Context;
use crate::error::CliResult;
use crate::output;

/// Run the diff command
pub fn run(mut ctx: Context, args: DiffArgs) -> CliResult<()> {
    let diff = ctx.ddl.diff()?;

    if diff.is_empty() {
        output::warn("The diff engine produced no statements");
    }

    match args.output {
        Some(path) => {
            std::fs::write(&path, diff.to_sql())?;
            output::success(&format!(
                "Wrote {} statements to {}",
                diff.len(),
                path.display()
            ));
        }
        // Plain SQL on stdout so the output can be piped.
        None => print!("{}", diff.to_sql()),
    }

    Ok(())
}
