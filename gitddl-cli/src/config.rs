//! CLI configuration handling.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use gitddl::{CommandDiffEngine, DEFAULT_VERSION_TABLE, Dsn, GitDdlConfig, OnConnect};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::cli::GlobalArgs;
use crate::error::{CliError, CliResult};

/// Default config file name (lives in the repository root)
pub const CONFIG_FILE_NAME: &str = "gitddl.toml";

/// Environment variable consulted when no database URL is configured
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var pattern")
});

/// gitddl CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Repository work tree, relative to the config file
    pub work_tree: PathBuf,

    /// Schema file, relative to the work tree
    pub ddl_file: PathBuf,

    /// Version marker table
    pub version_table: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Diff engine configuration
    pub diff: DiffConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_tree: PathBuf::from("."),
            ddl_file: PathBuf::from("schema.sql"),
            version_table: DEFAULT_VERSION_TABLE.to_string(),
            database: DatabaseConfig::default(),
            diff: DiffConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL (may reference `${VAR}`)
    pub url: Option<String>,

    /// Statements to run right after connecting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_connect_do: Option<OnConnect>,
}

/// Diff engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// External diff program
    pub command: Option<PathBuf>,

    /// Arguments; `{from}`, `{to}` and `{dialect}` are substituted
    pub args: Vec<String>,

    /// Unrecognized driver names to pass through as dialects
    pub allowed_dialects: Vec<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, else fall back to defaults
    pub fn load_or_default(path: &Path) -> CliResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, args: &GlobalArgs) {
        if let Some(work_tree) = &args.work_tree {
            self.work_tree = work_tree.clone();
        }
        if let Some(ddl_file) = &args.ddl_file {
            self.ddl_file = ddl_file.clone();
        }
        if let Some(dsn) = &args.dsn {
            self.database.url = Some(dsn.clone());
        }
        if let Some(table) = &args.version_table {
            self.version_table = table.clone();
        }
    }

    /// Resolve the database URL.
    ///
    /// `${VAR}` references are expanded; a URL that still references an
    /// unset variable is ignored in favour of `DATABASE_URL`.
    pub fn get_database_url(&self) -> CliResult<String> {
        if let Some(url) = &self.database.url {
            let expanded = expand_env_vars(url);
            if !expanded.is_empty() && !ENV_VAR.is_match(&expanded) {
                return Ok(expanded);
            }
        }

        std::env::var(DATABASE_URL_ENV).map_err(|_| {
            CliError::Config(format!(
                "Database URL not found. Set {} or configure [database] url in {}",
                DATABASE_URL_ENV, CONFIG_FILE_NAME
            ))
        })
    }

    /// Build the core configuration.
    ///
    /// A relative `work_tree` is resolved against `base`, the directory
    /// holding the config file.
    pub fn to_gitddl_config(&self, base: &Path) -> CliResult<GitDdlConfig> {
        let mut dsn = Dsn::new(self.get_database_url()?);
        if let Some(hook) = &self.database.on_connect_do {
            dsn = dsn.on_connect_do(hook.clone());
        }

        let work_tree = if self.work_tree.is_absolute() {
            self.work_tree.clone()
        } else {
            base.join(&self.work_tree)
        };

        let mut config = GitDdlConfig::new(work_tree, &self.ddl_file, dsn)
            .version_table(self.version_table.clone());

        if let Some(program) = &self.diff.command {
            config = config
                .diff_command(CommandDiffEngine::new(program).args(self.diff.args.iter().cloned()));
        }
        for name in &self.diff.allowed_dialects {
            config = config.allow_dialect(name.clone());
        }

        Ok(config)
    }
}

/// Expand `${VAR}` references to set environment variables.
///
/// Unset variables are left in place.
pub fn expand_env_vars(s: &str) -> String {
    ENV_VAR
        .replace_all(s, |caps: &regex_lite::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
