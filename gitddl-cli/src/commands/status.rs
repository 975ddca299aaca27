//! `gitddl status` command - Show deployed and desired versions.

use gitddl::DeploymentStatus;

use crate::cli::StatusArgs;
use crate::commands::Context;
use crate::error::CliResult;
use crate::output::{self, style_pending, style_success};

/// Run the status command
pub fn run(mut ctx: Context, args: StatusArgs) -> CliResult<()> {
    let status = ctx.ddl.status()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    output::header("Schema Status");
    ctx.print_target();

    match &status {
        DeploymentStatus::NotDeployed { desired } => {
            output::kv("Deployed", &style_pending("(none)"));
            output::kv("Desired", desired.as_str());
            output::newline();
            output::info("Run `gitddl deploy` to create the schema");
        }
        DeploymentStatus::UpToDate { version } => {
            output::kv("Deployed", &style_success(version.as_str()));
            output::kv("Desired", version.as_str());
            output::newline();
            output::success(&status.summary());
        }
        DeploymentStatus::Outdated { deployed, desired } => {
            output::kv("Deployed", &style_pending(deployed.as_str()));
            output::kv("Desired", desired.as_str());
            output::newline();
            output::warn(&status.summary());
            output::info("Run `gitddl diff` to review and `gitddl upgrade` to apply");
        }
    }

    Ok(())
}
