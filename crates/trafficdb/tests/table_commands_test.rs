
use predicates::boolean::PredicateBooleanExt;
use predicates::str::contains;
use setup::DEFAULT_TIMEOUT;

use crate::setup::make_cli;

fn init_sqlite(dir: &tempfile::TempDir) -> String {
    let path = dir.path().join("traffic.db").to_string_lossy().into_owned();
    make_cli()
        .timeout(DEFAULT_TIMEOUT)
        .args(["init-schema", "--sqlite", path.as_str()])
        .assert()
        .success()
        .stdout(contains("Traffic schema is ready"));
    path
}

#[test]
fn test_tables_lists_catalog() {
    make_cli()
        .arg("tables")
        .assert()
        .success()
        .stdout(contains("accident").and(contains("vehicleviolation")));
}

#[test]
fn test_read_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = init_sqlite(&dir);

    let assert = make_cli()
        .timeout(DEFAULT_TIMEOUT)
        .args(["read", "violation", "--sqlite", path.as_str()])
        .assert()
        .success();

    let out: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(serde_json::json!([]), out);
}

#[test]
fn test_columns_and_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = init_sqlite(&dir);

    make_cli()
        .timeout(DEFAULT_TIMEOUT)
        .args(["columns", "roadcamera", "--sqlite", path.as_str()])
        .assert()
        .success()
        .stdout(contains("\"RoadID\"").and(contains("\"CameraID\"")));

    make_cli()
        .timeout(DEFAULT_TIMEOUT)
        .args(["count", "road", "--sqlite", path.as_str()])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_unsupported_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = init_sqlite(&dir);

    make_cli()
        .timeout(DEFAULT_TIMEOUT)
        .args(["read", "users", "--sqlite", path.as_str()])
        .assert()
        .failure()
        .stderr(contains("Table 'users' is not supported"));
}

#[test]
/// A database has to be picked for table commands.
fn test_requires_database() {
    make_cli()
        .args(["read", "road"])
        .assert()
        .failure()
        .stderr(contains("no database configured"));
}

#[test]
/// Can't use --mysql-url and --sqlite at the same time.
fn test_database_conflict() {
    make_cli()
        .args([
            "read",
            "road",
            "--mysql-url",
            "mysql://root@localhost/traffic",
            "--sqlite",
            "traffic.db",
        ])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}
