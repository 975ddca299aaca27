//! `gitddl init` command - Write a starter configuration file.

use crate::cli::InitArgs;
use crate::config::{CONFIG_FILE_NAME, Config};
use crate::error::{CliError, CliResult};
use crate::output::{self, success};

/// Run the init command
pub fn run(args: InitArgs) -> CliResult<()> {
    output::header("Initialize gitddl");

    if !args.path.is_dir() {
        return Err(CliError::Config(format!(
            "{} is not a directory",
            args.path.display()
        )));
    }

    let config_path = args.path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !args.force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }

    let mut config = Config {
        ddl_file: args.schema.clone(),
        ..Config::default()
    };
    config.database.url = args.url;

    output::step(1, 1, "Creating configuration file...");
    config.save(&config_path)?;

    output::newline();
    success(&format!("Created {}", config_path.display()));

    if !args.path.join(&args.schema).exists() {
        output::warn(&format!(
            "{} does not exist yet; create and commit it before deploying",
            args.schema.display()
        ));
    }
    if !args.path.join(".git").exists() {
        output::warn("No .git directory here; set work_tree to your repository root");
    }

    output::newline();
    output::section("Next steps");
    if config.database.url.is_none() {
        output::list_item("Set [database] url in gitddl.toml, or export DATABASE_URL");
    }
    output::list_item("Set [diff] command to your schema diff tool");
    output::list_item("Run `gitddl deploy` on an empty database");

    Ok(())
}
