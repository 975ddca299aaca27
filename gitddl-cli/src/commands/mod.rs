//! CLI command implementations.

pub mod check;
pub mod deploy;
pub mod diff;
pub mod init;
pub mod status;
pub mod upgrade;
pub mod version;

use std::path::{Path, PathBuf};

use gitddl::GitDdl;
use tracing::debug;

use crate::cli::GlobalArgs;
use crate::config::Config;
use crate::error::CliResult;
use crate::output;

/// Everything a database command needs.
pub struct Context {
    /// Resolved CLI configuration (file plus overrides)
    pub config: Config,
    /// Path the configuration was read from
    pub config_path: PathBuf,
    /// The deployment engine
    pub ddl: GitDdl,
}

impl Context {
    /// Load `gitddl.toml`, apply overrides, and build the engine.
    ///
    /// A missing config file is fine as long as the overrides (or
    /// `DATABASE_URL`) supply a database.
    pub fn load(args: &GlobalArgs) -> CliResult<Self> {
        let mut config = Config::load_or_default(&args.config)?;
        config.apply_overrides(args);

        let base = args
            .config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let core = config.to_gitddl_config(base)?;
        debug!(
            config = %args.config.display(),
            work_tree = %core.work_tree.display(),
            ddl_file = %core.ddl_file.display(),
            "Loaded configuration"
        );

        Ok(Self {
            config,
            config_path: args.config.clone(),
            ddl: GitDdl::new(core)?,
        })
    }

    /// Print where the schema and database live.
    pub fn print_target(&self) {
        let core = self.ddl.config();
        output::kv("Schema", &core.ddl_path().display().to_string());
        output::kv(
            "Database",
            &format!("{} ({})", core.dsn.driver(), self.ddl.dialect()),
        );
        output::kv("Marker", &self.config.version_table);
        output::newline();
    }
}
