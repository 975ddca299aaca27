//! `gitddl upgrade` command - Bring the database to the latest schema commit.

use gitddl::DeploymentStatus;

use crate::cli::UpgradeArgs;
use crate::commands::Context;
use crate::error::{CliError, CliResult};
use crate::output::{self, confirm};

/// Run the upgrade command
pub fn run(mut ctx: Context, args: UpgradeArgs) -> CliResult<()> {
    output::header("Upgrade Database");
    ctx.print_target();

    output::step(1, 3, "Comparing versions...");
    let (deployed, desired) = match ctx.ddl.status()? {
        DeploymentStatus::UpToDate { version } => {
            output::newline();
            output::success(&format!("Already up to date at {}", version.short()));
            return Ok(());
        }
        DeploymentStatus::NotDeployed { desired } => {
            return Err(CliError::Config(format!(
                "Database has no version marker; run `gitddl deploy` first (schema is at {})",
                desired.short()
            )));
        }
        DeploymentStatus::Outdated { deployed, desired } => (deployed, desired),
    };
    output::list_item(&format!("{} -> {}", deployed.short(), desired.short()));

    output::step(2, 3, "Computing schema diff...");
    let plan = ctx.ddl.plan_upgrade()?;
    let diff = &plan.diff;
    if diff.is_empty() {
        output::list_item("No statements; only the version marker will move");
    } else {
        output::sql(diff.statements());
    }

    if args.dry_run {
        output::dim("Dry run, nothing applied.");
        return Ok(());
    }

    if !args.yes && !confirm(&format!("Apply {} statements?", diff.len())) {
        return Err(CliError::Aborted);
    }

    output::step(3, 3, "Applying changes...");
    let report = ctx.ddl.apply_upgrade(&plan)?;

    output::newline();
    output::success(&report.summary());
    Ok(())
}
