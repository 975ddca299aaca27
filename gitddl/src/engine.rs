//! Deployment engine.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::GitDdlConfig;
use crate::database::{self, Database};
use crate::dialect::Dialect;
use crate::diff::{DiffEngine, SchemaDiff, compute_diff};
use crate::error::{GitDdlError, GitDdlResult};
use crate::executor::{execute_statements, transaction, update_marker};
use crate::marker::{MarkerState, MarkerTable, validate_table_name};
use crate::snapshot::Snapshot;
use crate::vcs::{GitRepository, VersionControl};
use crate::version::SchemaVersion;

/// Where the database stands relative to history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// No marker yet; `deploy` is needed.
    NotDeployed {
        /// Version `deploy` would record.
        desired: SchemaVersion,
    },
    /// The marker matches the latest schema commit.
    UpToDate {
        /// Deployed version.
        version: SchemaVersion,
    },
    /// The schema changed since the last deploy or upgrade.
    Outdated {
        /// Version recorded in the database.
        deployed: SchemaVersion,
        /// Latest schema commit.
        desired: SchemaVersion,
    },
}

impl DeploymentStatus {
    /// Check if the database matches history.
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Self::UpToDate { .. })
    }

    /// Get a one-line summary.
    pub fn summary(&self) -> String {
        match self {
            Self::NotDeployed { desired } => {
                format!("Not deployed (schema is at {})", desired.short())
            }
            Self::UpToDate { version } => format!("Up to date at {}", version.short()),
            Self::Outdated { deployed, desired } => format!(
                "Outdated: database at {}, schema at {}",
                deployed.short(),
                desired.short()
            ),
        }
    }
}

/// Result of a deploy.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    /// Version recorded in the marker.
    pub version: SchemaVersion,
    /// Number of schema statements executed.
    pub statements_applied: usize,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl DeployReport {
    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        format!(
            "Deployed {} ({} statements in {}ms)",
            self.version.short(),
            self.statements_applied,
            self.duration_ms
        )
    }
}

/// An upgrade computed but not yet applied.
#[derive(Debug, Clone, Serialize)]
pub struct UpgradePlan {
    /// Version the database is at.
    pub from: SchemaVersion,
    /// Version the marker will record.
    pub to: SchemaVersion,
    /// Statements to run.
    pub diff: SchemaDiff,
}

/// Result of an upgrade.
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeReport {
    /// Version the database was at.
    pub from: SchemaVersion,
    /// Version the database is at now.
    pub to: SchemaVersion,
    /// Number of diff statements executed.
    pub statements_applied: usize,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl UpgradeReport {
    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        format!(
            "Upgraded {} -> {} ({} statements in {}ms)",
            self.from.short(),
            self.to.short(),
            self.statements_applied,
            self.duration_ms
        )
    }
}

/// Reconciles one database with the schema file tracked in git.
///
/// The database connection and repository handle are created on first use
/// and owned until the instance is dropped. All methods block.
pub struct GitDdl {
    config: GitDdlConfig,
    dialect: Dialect,
    database: Option<Box<dyn Database>>,
    repository: Option<Box<dyn VersionControl>>,
    differ: Option<Box<dyn DiffEngine>>,
}

impl GitDdl {
    /// Create an engine. No connection is opened yet.
    ///
    /// Fails if the DSN's driver maps to a dialect that is neither built in
    /// nor listed in `allowed_dialects`.
    pub fn new(config: GitDdlConfig) -> GitDdlResult<Self> {
        let dialect = Dialect::resolve(config.dsn.driver(), &config.allowed_dialects)?;
        let differ = config
            .diff_command
            .clone()
            .map(|cmd| Box::new(cmd) as Box<dyn DiffEngine>);

        Ok(Self {
            config,
            dialect,
            database: None,
            repository: None,
            differ,
        })
    }

    /// Use an already-open database instead of connecting through the DSN.
    ///
    /// The DSN's on-connect hook is not run for injected handles.
    pub fn with_database(mut self, db: impl Database + 'static) -> Self {
        self.database = Some(Box::new(db));
        self
    }

    /// Use a specific version control backend.
    pub fn with_repository(mut self, repo: impl VersionControl + 'static) -> Self {
        self.repository = Some(Box::new(repo));
        self
    }

    /// Use a specific diff engine.
    pub fn with_diff_engine(mut self, engine: impl DiffEngine + 'static) -> Self {
        self.differ = Some(Box::new(engine));
        self
    }

    /// The configuration.
    pub fn config(&self) -> &GitDdlConfig {
        &self.config
    }

    /// The dialect handed to the diff engine.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Open the database and repository now instead of on first use.
    pub fn connect(&mut self) -> GitDdlResult<()> {
        self.database()?;
        self.repository()?;
        Ok(())
    }

    fn database(&mut self) -> GitDdlResult<&mut dyn Database> {
        let db: Box<dyn Database> = match self.database.take() {
            Some(db) => db,
            None => {
                info!(driver = %self.config.dsn.driver(), "Connecting to database");
                database::connect(&self.config.dsn)?
            }
        };
        let db: &mut dyn Database = &mut **self.database.insert(db);
        Ok(db)
    }

    fn repository(&mut self) -> GitDdlResult<&dyn VersionControl> {
        let repo: Box<dyn VersionControl> = match self.repository.take() {
            Some(repo) => repo,
            None => {
                debug!(work_tree = %self.config.work_tree.display(), "Opening repository");
                Box::new(GitRepository::open(&self.config.work_tree)?)
            }
        };
        let repo: &dyn VersionControl = &**self.repository.insert(repo);
        Ok(repo)
    }

    fn marker_table(&self) -> GitDdlResult<MarkerTable> {
        MarkerTable::new(self.config.version_table.as_str())
    }

    /// The latest commit that touched the schema file.
    pub fn desired_version(&mut self) -> GitDdlResult<SchemaVersion> {
        let ddl_file = self.config.ddl_file.clone();
        self.repository()?
            .latest_commit_touching(&ddl_file)?
            .ok_or(GitDdlError::NoHistory(ddl_file))
    }

    fn marker_state(&mut self) -> GitDdlResult<MarkerState> {
        let table = self.marker_table()?;
        let db = self.database()?;
        if !db.table_exists(table.name())? {
            return Ok(MarkerState::Absent);
        }
        let rows = db.query_column(&table.select_sql()).map_err(|e| {
            GitDdlError::deployment_missing(format!("cannot read {}: {}", table.name(), e))
        })?;
        MarkerState::from_rows(rows)
    }

    /// The version recorded in the marker table.
    ///
    /// Fails with [`GitDdlError::DeploymentMissing`] when there is no marker.
    /// Use [`deployed_version`](Self::deployed_version) to probe instead.
    pub fn database_version(&mut self) -> GitDdlResult<SchemaVersion> {
        validate_table_name(&self.config.version_table)?;
        match self.marker_state()? {
            MarkerState::Present(version) => Ok(version),
            MarkerState::Absent => Err(GitDdlError::deployment_missing(format!(
                "table {} does not exist",
                self.config.version_table
            ))),
            MarkerState::Empty => Err(GitDdlError::deployment_missing(format!(
                "table {} has no version row",
                self.config.version_table
            ))),
        }
    }

    /// The deployed version, or `None` if the database was never deployed.
    pub fn deployed_version(&mut self) -> GitDdlResult<Option<SchemaVersion>> {
        Ok(match self.marker_state()? {
            MarkerState::Present(version) => Some(version),
            MarkerState::Absent | MarkerState::Empty => None,
        })
    }

    /// Check whether a version marker exists.
    pub fn is_deployed(&mut self) -> GitDdlResult<bool> {
        Ok(self.deployed_version()?.is_some())
    }

    /// Check whether the database matches the latest schema commit.
    pub fn check_version(&mut self) -> GitDdlResult<bool> {
        let deployed = self.database_version()?;
        let desired = self.desired_version()?;
        Ok(deployed == desired)
    }

    /// Summarize the database state without changing it.
    pub fn status(&mut self) -> GitDdlResult<DeploymentStatus> {
        let desired = self.desired_version()?;
        Ok(match self.deployed_version()? {
            None => DeploymentStatus::NotDeployed { desired },
            Some(version) if version == desired => DeploymentStatus::UpToDate { version },
            Some(deployed) => DeploymentStatus::Outdated { deployed, desired },
        })
    }

    /// The schema file exactly as committed at `version`.
    pub fn snapshot(&mut self, version: &SchemaVersion) -> GitDdlResult<Snapshot> {
        let ddl_file = self.config.ddl_file.clone();
        Snapshot::retrieve(self.repository()?, version, &ddl_file)
    }

    /// Statements that bring the deployed schema to the working-tree schema.
    ///
    /// Fails with [`GitDdlError::NoDifferenceExpected`] when the database is
    /// already at the latest schema commit.
    pub fn diff(&mut self) -> GitDdlResult<SchemaDiff> {
        Ok(self.plan_upgrade()?.diff)
    }

    /// Compute the upgrade without applying it.
    ///
    /// The plan can be shown to a user and then handed to
    /// [`apply_upgrade`](Self::apply_upgrade), which runs exactly these
    /// statements.
    #[instrument(skip(self))]
    pub fn plan_upgrade(&mut self) -> GitDdlResult<UpgradePlan> {
        let from = self.database_version()?;
        let to = self.desired_version()?;
        if from == to {
            return Err(GitDdlError::NoDifferenceExpected(from));
        }
        let diff = self.diff_from(&from)?;
        Ok(UpgradePlan { from, to, diff })
    }

    fn diff_from(&mut self, deployed: &SchemaVersion) -> GitDdlResult<SchemaDiff> {
        let source = self.snapshot(deployed)?;
        let target = self.config.ddl_path();
        let engine = self.differ.as_deref().ok_or_else(|| {
            GitDdlError::config("no diff engine configured (set a diff command)")
        })?;
        compute_diff(engine, &source, &target, &self.dialect)
    }

    /// Create the schema and the version marker on an empty database.
    ///
    /// The schema statements, the marker table, and the marker row are
    /// written in one transaction.
    #[instrument(skip(self))]
    pub fn deploy(&mut self) -> GitDdlResult<DeployReport> {
        let start = Instant::now();
        let table = self.marker_table()?;

        match self.marker_state()? {
            MarkerState::Absent => {}
            MarkerState::Present(version) => return Err(GitDdlError::AlreadyDeployed(version)),
            MarkerState::Empty => {
                return Err(GitDdlError::marker_inconsistent(format!(
                    "table {} exists but holds no version",
                    table.name()
                )));
            }
        }

        let version = self.desired_version()?;
        let ddl = std::fs::read_to_string(self.config.ddl_path())?;

        info!(version = %version.short(), "Deploying schema");
        let db = self.database()?;
        let statements_applied = transaction(db, |db| {
            let applied = execute_statements(db, &ddl)?;
            db.execute(&table.create_sql())?;
            db.execute(&table.insert_sql(&version))?;
            Ok(applied)
        })?;

        let report = DeployReport {
            version,
            statements_applied,
            duration_ms: start.elapsed().as_millis() as i64,
        };
        info!("{}", report.summary());
        Ok(report)
    }

    /// Apply the schema diff and move the marker to the latest schema commit.
    ///
    /// The diff statements and the marker update run in one transaction; the
    /// marker update must change exactly one row.
    pub fn upgrade_database(&mut self) -> GitDdlResult<UpgradeReport> {
        let plan = self.plan_upgrade()?;
        self.apply_upgrade(&plan)
    }

    /// Apply a previously computed plan.
    ///
    /// The marker moves from `plan.from` to `plan.to` only if it still holds
    /// `plan.from`; otherwise nothing is applied.
    #[instrument(skip(self, plan), fields(from = %plan.from.short(), to = %plan.to.short()))]
    pub fn apply_upgrade(&mut self, plan: &UpgradePlan) -> GitDdlResult<UpgradeReport> {
        let start = Instant::now();
        let table = self.marker_table()?;
        let sql = plan.diff.to_sql();

        info!(statements = plan.diff.len(), "Upgrading database");
        let db = self.database()?;
        let statements_applied = transaction(db, |db| {
            let applied = execute_statements(db, &sql)?;
            update_marker(db, &table, &plan.from, &plan.to)?;
            Ok(applied)
        })?;

        let report = UpgradeReport {
            from: plan.from.clone(),
            to: plan.to.clone(),
            statements_applied,
            duration_ms: start.elapsed().as_millis() as i64,
        };
        info!("{}", report.summary());
        Ok(report)
    }
}
