//! gitddl CLI - Command-line interface for git-tracked schema deployment.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gitddl_cli::cli::{Cli, Command};
use gitddl_cli::commands::{self, Context};
use gitddl_cli::error::CliResult;
use gitddl_cli::output;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if let Err(e) = run(cli) {
        output::error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "gitddl=info,gitddl_cli=info",
        2 => "gitddl=debug,gitddl_cli=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run(cli: Cli) -> CliResult<()> {
    let global = &cli.global;
    match cli.command {
        Command::Init(args) => commands::init::run(args),
        Command::Status(args) => commands::status::run(Context::load(global)?, args),
        Command::Check => commands::check::run(Context::load(global)?),
        Command::Diff(args) => commands::diff::run(Context::load(global)?, args),
        Command::Deploy => commands::deploy::run(Context::load(global)?),
        Command::Upgrade(args) => commands::upgrade::run(Context::load(global)?, args),
        Command::Version => commands::version::run(),
    }
}
