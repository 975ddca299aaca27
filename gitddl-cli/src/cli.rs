//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILE_NAME;

/// gitddl - Keep a database schema in step with git
#[derive(Parser, Debug)]
#[command(name = "gitddl")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "gitddl - Keep a database schema in step with git", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Repository work tree (overrides the config file)
    #[arg(long, global = true)]
    pub work_tree: Option<PathBuf>,

    /// Schema file, relative to the work tree (overrides the config file)
    #[arg(long, global = true)]
    pub ddl_file: Option<PathBuf>,

    /// Database connection string (overrides the config file)
    #[arg(long, global = true, env = "GITDDL_DSN")]
    pub dsn: Option<String>,

    /// Version marker table (overrides the config file)
    #[arg(long, global = true)]
    pub version_table: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a gitddl.toml configuration file
    Init(InitArgs),

    /// Show deployed and desired schema versions
    Status(StatusArgs),

    /// Exit non-zero unless the database matches the latest schema commit
    Check,

    /// Print the statements an upgrade would run
    Diff(DiffArgs),

    /// Create the schema and version marker on an empty database
    Deploy,

    /// Bring the database to the latest schema commit
    Upgrade(UpgradeArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Init Command
// =============================================================================

/// Arguments for the `init` command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to write the configuration into
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Database connection URL to record
    #[arg(short, long)]
    pub url: Option<String>,

    /// Schema file to record
    #[arg(long, default_value = "schema.sql")]
    pub schema: PathBuf,

    /// Overwrite an existing configuration file
    #[arg(short, long)]
    pub force: bool,
}

// =============================================================================
// Status Command
// =============================================================================

/// Arguments for the `status` command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

// =============================================================================
// Diff Command
// =============================================================================

/// Arguments for the `diff` command
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Write the statements to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

// =============================================================================
// Upgrade Command
// =============================================================================

/// Arguments for the `upgrade` command
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Show the statements without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}
