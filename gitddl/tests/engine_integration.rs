//! Integration tests for the deployment lifecycle.
//!
//! These run the engine against a SQLite file with an in-memory history,
//! so no git executable is needed.

#![cfg(feature = "sqlite")]

mod common;

use common::{
    A, B, C, RecordingDatabase, SCHEMA_FILE, Workspace, half_broken, self_wrapped, v,
};
use gitddl::{
    Database, DeploymentStatus, GitDdl, GitDdlError, MarkerTable, SqliteDatabase,
    DEFAULT_VERSION_TABLE,
};
use pretty_assertions::assert_eq;

const SCHEMA_A: &str = "CREATE TABLE foo (id INT);\n";
const SCHEMA_B: &str = "CREATE TABLE foo (id INT, name TEXT);\n";

/// Test a fresh deploy records the desired version
#[test]
fn test_deploy_records_desired_version() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    assert!(!ddl.is_deployed().unwrap());

    let report = ddl.deploy().expect("deploy");
    assert_eq!(report.version, v(A));
    assert_eq!(report.statements_applied, 1);

    assert!(ddl.is_deployed().unwrap());
    assert_eq!(ddl.database_version().unwrap(), v(A));
    assert_eq!(ddl.desired_version().unwrap(), v(A));
    assert!(ddl.check_version().unwrap());
    assert_eq!(ws.columns("foo"), vec!["id"]);
}

/// Test a second deploy is refused and changes nothing
#[test]
fn test_deploy_twice_fails() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    ddl.deploy().unwrap();

    let err = ddl.deploy().unwrap_err();
    assert!(matches!(err, GitDdlError::AlreadyDeployed(ref version) if *version == v(A)));
    assert_eq!(ddl.database_version().unwrap(), v(A));
}

/// Test reading the version before any deploy
#[test]
fn test_database_version_before_deploy() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    let err = ddl.database_version().unwrap_err();
    assert!(err.is_not_deployed());
    assert_eq!(ddl.deployed_version().unwrap(), None);
    assert!(ddl.check_version().unwrap_err().is_not_deployed());
}

/// Test an empty marker table is reported, not treated as a fresh database
#[test]
fn test_empty_marker_table() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);
    ws.inspect()
        .execute(&MarkerTable::default().create_sql())
        .unwrap();

    let mut ddl = ws.engine();
    assert!(!ddl.is_deployed().unwrap());
    assert!(ddl.database_version().unwrap_err().is_not_deployed());
    assert!(matches!(
        ddl.deploy().unwrap_err(),
        GitDdlError::MarkerInconsistent(_)
    ));
}

/// Test a marker table holding two rows is rejected
#[test]
fn test_duplicate_marker_rows() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    ddl.deploy().unwrap();
    ws.inspect()
        .execute(&MarkerTable::default().insert_sql(&v(A)))
        .unwrap();

    let err = ddl.database_version().unwrap_err();
    assert!(matches!(err, GitDdlError::MarkerInconsistent(_)));
    assert!(err.to_string().contains("found 2"));
}

/// Test diff is refused when the database is current
#[test]
fn test_diff_when_up_to_date() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    ddl.deploy().unwrap();

    let err = ddl.diff().unwrap_err();
    assert!(matches!(err, GitDdlError::NoDifferenceExpected(ref version) if *version == v(A)));

    let err = ddl.upgrade_database().unwrap_err();
    assert!(matches!(err, GitDdlError::NoDifferenceExpected(_)));
}

/// Test the full deploy, change, upgrade cycle
#[test]
fn test_upgrade_moves_marker() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    ddl.deploy().unwrap();

    ws.commit(B, SCHEMA_B);
    assert!(!ddl.check_version().unwrap());

    let diff = ddl.diff().unwrap();
    assert_eq!(diff.statements(), ["ALTER TABLE foo ADD COLUMN name TEXT"]);
    // Computing a diff changes nothing.
    assert_eq!(ddl.database_version().unwrap(), v(A));

    let report = ddl.upgrade_database().unwrap();
    assert_eq!(report.from, v(A));
    assert_eq!(report.to, v(B));
    assert_eq!(report.statements_applied, 1);

    assert_eq!(ddl.database_version().unwrap(), v(B));
    assert!(ddl.check_version().unwrap());
    assert!(ddl.check_version().unwrap());
    assert_eq!(ws.columns("foo"), vec!["id", "name"]);
}

/// Test the diff source is the deployed snapshot, not the previous commit
#[test]
fn test_upgrade_skips_intermediate_commits() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    ddl.deploy().unwrap();

    ws.commit(B, SCHEMA_B);
    ws.commit(C, "CREATE TABLE foo (id INT, name TEXT, age INT);\n");

    let diff = ddl.diff().unwrap();
    assert_eq!(
        diff.statements(),
        [
            "ALTER TABLE foo ADD COLUMN name TEXT",
            "ALTER TABLE foo ADD COLUMN age INT"
        ]
    );

    ddl.upgrade_database().unwrap();
    assert_eq!(ddl.database_version().unwrap(), v(C));
}

/// Test a failing statement leaves schema and marker untouched
#[test]
fn test_failed_upgrade_rolls_back() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    ddl.deploy().unwrap();
    ws.commit(B, SCHEMA_B);

    let mut ddl = ws.engine().with_diff_engine(half_broken);
    let err = ddl.upgrade_database().unwrap_err();
    match err {
        GitDdlError::Statement {
            index, statement, ..
        } => {
            assert_eq!(index, 2);
            assert!(statement.contains("no_such_table"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(ddl.database_version().unwrap(), v(A));
    assert_eq!(ws.columns("foo"), vec!["id"]);
}

/// Test a schema file with leading and trailing comments deploys
#[test]
fn test_deploy_schema_with_comments() {
    let ws = Workspace::new();
    ws.commit(
        A,
        "-- schema v1\nCREATE TABLE foo (id INT);\n/* indexes go here */\n-- end of schema\n",
    );

    let mut ddl = ws.engine();
    let report = ddl.deploy().expect("deploy");
    assert_eq!(report.statements_applied, 1);
    assert_eq!(ddl.database_version().unwrap(), v(A));
    assert_eq!(ws.columns("foo"), vec!["id"]);
}

/// Test a diff engine's own BEGIN/COMMIT does not break the upgrade
#[test]
fn test_upgrade_with_engine_transaction_statements() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    ddl.deploy().unwrap();
    ws.commit(B, SCHEMA_B);

    let mut ddl = ws.engine().with_diff_engine(self_wrapped);
    assert_eq!(
        ddl.diff().unwrap().statements(),
        ["ALTER TABLE foo ADD COLUMN name TEXT"]
    );

    let report = ddl.upgrade_database().unwrap();
    assert_eq!(report.statements_applied, 1);
    assert_eq!(ddl.database_version().unwrap(), v(B));
    assert_eq!(ws.columns("foo"), vec!["id", "name"]);
}

/// Test applying a plan runs the planned statements even if history moved on
#[test]
fn test_apply_upgrade_uses_planned_diff() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    ddl.deploy().unwrap();
    ws.commit(B, SCHEMA_B);

    let plan = ddl.plan_upgrade().unwrap();
    assert_eq!(plan.from, v(A));
    assert_eq!(plan.to, v(B));
    assert_eq!(plan.diff.statements(), ["ALTER TABLE foo ADD COLUMN name TEXT"]);
    assert_eq!(ddl.database_version().unwrap(), v(A));

    // A newer commit lands between planning and applying.
    ws.commit(C, "CREATE TABLE foo (id INT, name TEXT, age INT);\n");

    let report = ddl.apply_upgrade(&plan).unwrap();
    assert_eq!(report.to, v(B));
    assert_eq!(ws.columns("foo"), vec!["id", "name"]);
    assert_eq!(
        ddl.status().unwrap(),
        DeploymentStatus::Outdated {
            deployed: v(B),
            desired: v(C)
        }
    );

    ddl.upgrade_database().unwrap();
    assert_eq!(ws.columns("foo"), vec!["id", "name", "age"]);
}

/// Test a failing schema statement leaves no marker behind
#[test]
fn test_failed_deploy_rolls_back() {
    let ws = Workspace::new();
    ws.commit(A, "CREATE TABLE foo (id INT);\nCREATE TABLE foo (id INT);\n");

    let mut ddl = ws.engine();
    let err = ddl.deploy().unwrap_err();
    assert!(err.is_sql());

    assert!(!ddl.is_deployed().unwrap());
    let mut db = ws.inspect();
    assert!(!db.table_exists("foo").unwrap());
    assert!(!db.table_exists(DEFAULT_VERSION_TABLE).unwrap());
}

/// Test a marker moved by someone else makes the upgrade fail
#[test]
fn test_concurrent_marker_change_is_detected() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    ddl.deploy().unwrap();
    ws.commit(B, SCHEMA_B);

    let marker = MarkerTable::default();

    // The marker moves between the read and the update.
    struct Racing {
        inner: SqliteDatabase,
        marker: MarkerTable,
    }

    impl Database for Racing {
        fn execute(&mut self, sql: &str) -> gitddl::GitDdlResult<u64> {
            if sql.starts_with("UPDATE") {
                self.inner
                    .execute(&self.marker.update_sql(&v(A), &v(C)))?;
            }
            self.inner.execute(sql)
        }
        fn query_column(&mut self, sql: &str) -> gitddl::GitDdlResult<Vec<String>> {
            self.inner.query_column(sql)
        }
        fn table_exists(&mut self, table: &str) -> gitddl::GitDdlResult<bool> {
            self.inner.table_exists(table)
        }
        fn begin(&mut self) -> gitddl::GitDdlResult<()> {
            self.inner.begin()
        }
        fn commit(&mut self) -> gitddl::GitDdlResult<()> {
            self.inner.commit()
        }
        fn rollback(&mut self) -> gitddl::GitDdlResult<()> {
            self.inner.rollback()
        }
    }

    let racing = Racing {
        inner: ws.inspect(),
        marker: marker.clone(),
    };
    let mut ddl = ws.engine().with_database(racing);
    let err = ddl.upgrade_database().unwrap_err();
    assert!(matches!(err, GitDdlError::MarkerInconsistent(_)));

    // Rolled back, including the competing write made inside the transaction.
    assert_eq!(
        ws.inspect().query_column(&marker.select_sql()).unwrap(),
        vec![A]
    );
    assert_eq!(ws.columns("foo"), vec!["id"]);
}

/// Test an unsafe table name is rejected before touching the database
#[test]
fn test_bad_table_name_never_queries() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let config = ws.config().version_table("1bad;name");
    let (db, calls) = RecordingDatabase::new(SqliteDatabase::open_in_memory().unwrap());
    let mut ddl = ws.engine_with(config).with_database(db);

    assert!(matches!(ddl.database_version(), Err(GitDdlError::Config(_))));
    assert!(matches!(ddl.check_version(), Err(GitDdlError::Config(_))));
    assert!(matches!(ddl.deploy(), Err(GitDdlError::Config(_))));
    assert!(matches!(ddl.diff(), Err(GitDdlError::Config(_))));
    assert!(matches!(ddl.plan_upgrade(), Err(GitDdlError::Config(_))));
    assert!(matches!(ddl.upgrade_database(), Err(GitDdlError::Config(_))));
    assert!(matches!(ddl.status(), Err(GitDdlError::Config(_))));
    assert_eq!(calls.get(), 0);
}

/// Test a custom marker table name
#[test]
fn test_custom_version_table() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine_with(ws.config().version_table("schema_marker"));
    ddl.deploy().unwrap();

    let mut db = ws.inspect();
    assert!(db.table_exists("schema_marker").unwrap());
    assert!(!db.table_exists(DEFAULT_VERSION_TABLE).unwrap());
}

/// Test status across the lifecycle
#[test]
fn test_status_transitions() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    assert_eq!(
        ddl.status().unwrap(),
        DeploymentStatus::NotDeployed { desired: v(A) }
    );

    ddl.deploy().unwrap();
    assert_eq!(
        ddl.status().unwrap(),
        DeploymentStatus::UpToDate { version: v(A) }
    );

    ws.commit(B, SCHEMA_B);
    assert_eq!(
        ddl.status().unwrap(),
        DeploymentStatus::Outdated {
            deployed: v(A),
            desired: v(B)
        }
    );

    ddl.upgrade_database().unwrap();
    assert!(ddl.status().unwrap().is_up_to_date());
}

/// Test a schema file without history
#[test]
fn test_no_history() {
    let ws = Workspace::new();
    std::fs::write(ws.dir.path().join(SCHEMA_FILE), SCHEMA_A).unwrap();

    let mut ddl = ws.engine();
    assert!(matches!(ddl.desired_version(), Err(GitDdlError::NoHistory(_))));
    assert!(matches!(ddl.deploy(), Err(GitDdlError::NoHistory(_))));
    assert!(!ddl.is_deployed().unwrap());
}

/// Test snapshots come from history, not the working tree
#[test]
fn test_snapshot_reads_history() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);
    ws.commit(B, SCHEMA_B);

    let mut ddl = ws.engine();
    assert_eq!(ddl.snapshot(&v(A)).unwrap().bytes(), SCHEMA_A.as_bytes());
    assert_eq!(ddl.snapshot(&v(B)).unwrap().bytes(), SCHEMA_B.as_bytes());
    assert!(matches!(
        ddl.snapshot(&v(C)),
        Err(GitDdlError::NotFound { .. })
    ));
}

/// Test on-connect statements run before the engine's own queries
#[test]
fn test_on_connect_hook() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut config = ws.config();
    config.dsn = config
        .dsn
        .clone()
        .on_connect_do("CREATE TABLE IF NOT EXISTS hook_ran (id INT)");

    let mut ddl = ws.engine_with(config);
    ddl.connect().unwrap();
    assert!(ws.inspect().table_exists("hook_ran").unwrap());
}

/// Test diff without any engine configured
#[test]
fn test_missing_diff_engine() {
    let ws = Workspace::new();
    ws.commit(A, SCHEMA_A);

    let mut ddl = ws.engine();
    ddl.deploy().unwrap();
    ws.commit(B, SCHEMA_B);

    let mut ddl = GitDdl::new(ws.config())
        .unwrap()
        .with_repository(ws.history.clone());
    assert!(matches!(ddl.diff(), Err(GitDdlError::Config(_))));
}
