//! # gitddl
//!
//! Keep a database schema in step with a schema file tracked in git.
//!
//! This crate provides functionality for:
//! - Resolving the desired schema version (the latest commit touching the schema file)
//! - Reading the deployed version from a single-row marker table
//! - Retrieving the schema file byte-for-byte as it was at any commit
//! - Delegating the schema diff to an external engine
//! - Transactional deploys and upgrades that keep the marker consistent
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   latest commit   ┌────────────────┐
//! │ git history  │──────────────────▶│ desired version│──┐
//! └──────────────┘                   └────────────────┘  │ equal?
//!        │ blob at deployed version  ┌────────────────┐  │
//!        ▼                           │ marker table   │──┘
//! ┌──────────────┐                   └────────────────┘
//! │ snapshot     │──┐                        ▲
//! └──────────────┘  │  ┌─────────────┐       │ UPDATE (1 row)
//!                   ├─▶│ diff engine │──▶ statements ──▶ transaction
//! ┌──────────────┐  │  └─────────────┘
//! │ working file │──┘
//! └──────────────┘
//! ```
//!
//! Versions are commit hashes and are only compared for equality: the
//! database is either at the latest schema commit or it is not.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gitddl::{CommandDiffEngine, Dsn, GitDdl, GitDdlConfig};
//!
//! fn main() -> Result<(), gitddl::GitDdlError> {
//!     let config = GitDdlConfig::new(".", "sql/schema.sql", Dsn::new("sqlite://app.db"))
//!         .diff_command(
//!             CommandDiffEngine::new("sqldiff-tool")
//!                 .args(["--dialect", "{dialect}", "{from}", "{to}"]),
//!         );
//!
//!     let mut ddl = GitDdl::new(config)?;
//!
//!     if !ddl.is_deployed()? {
//!         let report = ddl.deploy()?;
//!         println!("{}", report.summary());
//!     } else if !ddl.check_version()? {
//!         println!("{}", ddl.diff()?);
//!         let report = ddl.upgrade_database()?;
//!         println!("{}", report.summary());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! Everything blocks and nothing is shared: a [`GitDdl`] owns its
//! connection and must not be used from several threads at once. There is
//! no cross-process locking. The marker update is a compare-and-swap on the
//! deployed version, so a second upgrader racing on the same database fails
//! and rolls back instead of silently overwriting the marker.

pub mod config;
pub mod database;
pub mod dialect;
pub mod diff;
pub mod engine;
pub mod error;
pub mod executor;
pub mod marker;
pub mod snapshot;
pub mod vcs;
pub mod version;

// Re-exports
pub use config::{Dsn, GitDdlConfig, OnConnect};
pub use database::{Database, connect};
#[cfg(feature = "postgres")]
pub use database::PostgresDatabase;
#[cfg(feature = "sqlite")]
pub use database::SqliteDatabase;
pub use dialect::Dialect;
pub use diff::{CommandDiffEngine, DiffEngine, DiffRequest, SchemaDiff};
pub use engine::{DeployReport, DeploymentStatus, GitDdl, UpgradePlan, UpgradeReport};
pub use error::{GitDdlError, GitDdlResult};
pub use executor::{apply_batch, split_statements, transaction};
pub use marker::{DEFAULT_VERSION_TABLE, MarkerTable};
pub use snapshot::Snapshot;
pub use vcs::{GitRepository, VersionControl};
pub use version::SchemaVersion;
