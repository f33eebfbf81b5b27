//! Generic CRUD over the tables in a [`Catalog`].

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::catalog::{Catalog, ColumnSet, TableDescriptor};
use crate::errors::{EngineError, Result};
use crate::executor::{Dialect, ExecuteResult, SqlExecutor, Statement};
use crate::ident::Validator;
use crate::projector::{self, Record};
use crate::scalar::ScalarValue;
use crate::sql;

/// Column name to value, in the order the caller supplied them.
pub type RecordPayload = IndexMap<String, ScalarValue>;

/// Create, read, update and delete rows of any catalog table.
///
/// Holds no per-call state. Each operation issues at most one metadata query
/// and one statement.
#[derive(Debug, Clone)]
pub struct CrudEngine {
    catalog: Arc<Catalog>,
    executor: Arc<dyn SqlExecutor>,
}

impl CrudEngine {
    pub fn new(catalog: Catalog, executor: Arc<dyn SqlExecutor>) -> Self {
        CrudEngine {
            catalog: Arc::new(catalog),
            executor,
        }
    }

    /// Engine over the traffic incident schema.
    pub fn traffic(executor: Arc<dyn SqlExecutor>) -> Self {
        Self::new(Catalog::traffic(), executor)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn executor(&self) -> &Arc<dyn SqlExecutor> {
        &self.executor
    }

    fn dialect(&self) -> Dialect {
        self.executor.dialect()
    }

    fn validator(&self) -> Validator<'_> {
        Validator::new(&self.catalog)
    }

    /// Names of all supported tables.
    pub fn tables(&self) -> Vec<String> {
        self.catalog.table_names().map(str::to_string).collect()
    }

    /// Insert a row. Payload keys must be exactly the table's insert columns.
    ///
    /// Returns false if the database rejected the insert.
    pub async fn create(&self, table: &str, payload: &RecordPayload) -> Result<bool> {
        let desc = self.validator().validate(table)?;
        let params = insert_params(desc, payload)?;
        let stmt = sql::insert(self.dialect(), desc, params);
        Ok(self.run_mutation(desc, "create", stmt).await)
    }

    /// Read every row of a table.
    pub async fn read(&self, table: &str) -> Result<Vec<Record>> {
        let desc = self.validator().validate(table)?;
        let stmt = sql::select_all(self.dialect(), desc);
        debug!(%stmt, "reading records");

        let result = self.run_query(desc, "read", &stmt).await?;
        Ok(projector::project(result))
    }

    /// Update the row identified by `key_values`.
    ///
    /// Returns false if no row matched or the database rejected the update.
    pub async fn update(
        &self,
        table: &str,
        key_values: &[ScalarValue],
        payload: &RecordPayload,
    ) -> Result<bool> {
        let desc = self.validator().validate(table)?;
        if payload.is_empty() {
            return Err(EngineError::EmptyUpdate(table.to_string()));
        }
        check_key_arity(desc, key_values)?;

        let columns = self.live_columns(desc, "update").await?;
        let validator = self.validator();
        let set_columns = payload
            .keys()
            .map(|col| validator.resolve_column(&columns, col))
            .collect::<Result<Vec<_>>>()?;

        // SET values first, then the key, matching placeholder order.
        let params = payload
            .values()
            .cloned()
            .chain(key_values.iter().cloned())
            .collect();

        let stmt = sql::update(self.dialect(), desc, &set_columns, params);
        Ok(self.run_mutation(desc, "update", stmt).await)
    }

    /// Delete the row identified by `key_values`.
    ///
    /// Returns false if no row matched or the database rejected the delete.
    pub async fn delete(&self, table: &str, key_values: &[ScalarValue]) -> Result<bool> {
        let desc = self.validator().validate(table)?;
        check_key_arity(desc, key_values)?;

        let stmt = sql::delete(self.dialect(), desc, key_values.to_vec());
        Ok(self.run_mutation(desc, "delete", stmt).await)
    }

    /// Column names of a table, straight from the database.
    pub async fn columns_for(&self, table: &str) -> Result<Vec<String>> {
        let desc = self.validator().validate(table)?;
        let columns = self.live_columns(desc, "columns").await?;
        Ok(columns.names())
    }

    /// Check whether a row with the given key exists.
    pub async fn exists(&self, table: &str, key_values: &[ScalarValue]) -> Result<bool> {
        let desc = self.validator().validate(table)?;
        check_key_arity(desc, key_values)?;

        let stmt = sql::count_by_key(self.dialect(), desc, key_values.to_vec());
        Ok(self.query_count(desc, "exists", stmt).await? > 0)
    }

    /// Number of rows in a table.
    pub async fn count(&self, table: &str) -> Result<u64> {
        let desc = self.validator().validate(table)?;
        let stmt = sql::count(self.dialect(), desc);
        self.query_count(desc, "count", stmt).await
    }

    async fn query_count(
        &self,
        desc: &TableDescriptor,
        op: &'static str,
        stmt: Statement,
    ) -> Result<u64> {
        debug!(%stmt, "counting rows");
        let result = self.run_query(desc, op, &stmt).await?;
        projector::first_scalar(&result)
            .and_then(ScalarValue::as_u64)
            .ok_or_else(|| {
                EngineError::UnexpectedResult(format!("expected a row count, got {:?}", result.rows))
            })
    }

    /// Execute a read only statement.
    ///
    /// Driver failures are logged here. The returned error only carries a
    /// generic message.
    async fn run_query(
        &self,
        desc: &TableDescriptor,
        op: &'static str,
        stmt: &Statement,
    ) -> Result<ExecuteResult> {
        trace!(params = ?stmt.params());
        self.executor.execute(stmt).await.map_err(|e| {
            warn!(
                table = %desc.name(),
                op,
                error = %e.driver_message(),
                "query failed"
            );
            EngineError::from(e)
        })
    }

    async fn live_columns(&self, desc: &TableDescriptor, op: &'static str) -> Result<ColumnSet> {
        self.catalog
            .columns_of(self.executor.as_ref(), desc.name().as_str())
            .await
            .inspect_err(|e| {
                if let EngineError::Execution(e) = e {
                    warn!(
                        table = %desc.name(),
                        op,
                        error = %e.driver_message(),
                        "column lookup failed"
                    );
                }
            })
    }

    /// Execute a mutating statement.
    ///
    /// Driver failures are logged here and reported as `false`, same as a
    /// statement that touched no rows.
    async fn run_mutation(&self, desc: &TableDescriptor, op: &'static str, stmt: Statement) -> bool {
        debug!(table = %desc.name(), op, %stmt, "executing");
        trace!(params = ?stmt.params());

        match self.executor.execute(&stmt).await {
            Ok(result) => {
                if result.rows_affected == 0 {
                    debug!(table = %desc.name(), op, "no rows matched");
                }
                result.rows_affected > 0
            }
            Err(e) => {
                warn!(
                    table = %desc.name(),
                    op,
                    error = %e.driver_message(),
                    "statement failed"
                );
                false
            }
        }
    }
}

fn check_key_arity(desc: &TableDescriptor, key_values: &[ScalarValue]) -> Result<()> {
    let expected = desc.primary_key().len();
    if key_values.len() != expected {
        return Err(EngineError::KeyArity {
            table: desc.name().to_string(),
            expected,
            got: key_values.len(),
        });
    }
    Ok(())
}

/// Order payload values by the table's insert columns.
///
/// Primary key columns that aren't insert columns (generated keys) may be
/// present if they are null or empty, which is what a blank form field
/// produces. They're dropped.
fn insert_params(desc: &TableDescriptor, payload: &RecordPayload) -> Result<Vec<ScalarValue>> {
    let lookup = |col: &str| {
        payload
            .get_index_of(col)
            .or_else(|| payload.keys().position(|k| k.eq_ignore_ascii_case(col)))
    };

    let mut used = vec![false; payload.len()];
    let mut params = Vec::with_capacity(desc.insert_columns().len());
    let mut missing = Vec::new();

    for col in desc.insert_columns() {
        match lookup(col.as_str()) {
            Some(idx) => {
                used[idx] = true;
                params.push(payload[idx].clone());
            }
            None => missing.push(col.to_string()),
        }
    }

    let unexpected: Vec<String> = payload
        .iter()
        .zip(used)
        .filter(|(_, used)| !used)
        .filter(|((key, value), _)| {
            let is_generated_key = desc
                .primary_key()
                .iter()
                .any(|pk| pk.as_str().eq_ignore_ascii_case(key));
            let is_blank = match value {
                ScalarValue::Null => true,
                ScalarValue::Utf8(s) => s.is_empty(),
                _ => false,
            };
            !(is_generated_key && is_blank)
        })
        .map(|((key, _), _)| key.clone())
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(EngineError::PayloadShape {
            table: desc.name().to_string(),
            missing,
            unexpected,
        });
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecuteResult;
    use crate::testutil::RecordingExecutor;

    fn engine() -> (CrudEngine, Arc<RecordingExecutor>) {
        logutil::init_test();
        let executor = Arc::new(RecordingExecutor::new());
        (CrudEngine::traffic(executor.clone()), executor)
    }

    fn payload<const N: usize>(entries: [(&str, ScalarValue); N]) -> RecordPayload {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn violation_columns() -> ExecuteResult {
        ExecuteResult::with_rows(
            ["COLUMN_NAME"],
            vec![
                vec!["ViolationID".into()],
                vec!["ViolationType".into()],
                vec!["FineAmount".into()],
            ],
        )
    }

    #[tokio::test]
    async fn unsupported_table_issues_no_sql() {
        let (engine, executor) = engine();
        let values = payload([("a", 1.into())]);

        let errs = [
            engine.create("parking", &values).await.unwrap_err(),
            engine.read("parking").await.unwrap_err(),
            engine
                .update("parking", &[1.into()], &values)
                .await
                .unwrap_err(),
            engine.delete("parking", &[1.into()]).await.unwrap_err(),
            engine.columns_for("parking").await.unwrap_err(),
            engine.count("parking").await.unwrap_err(),
        ];
        for err in errs {
            assert!(matches!(err, EngineError::UnsupportedTable(t) if t == "parking"));
        }

        assert!(executor.statements().is_empty());
    }

    #[tokio::test]
    async fn create_binds_in_insert_column_order() {
        let (engine, executor) = engine();
        executor.push_ok(ExecuteResult::affected(1));

        // Supplied out of order on purpose.
        let values = payload([("FineAmount", 150.0.into()), ("ViolationType", "Speeding".into())]);
        assert!(engine.create("violation", &values).await.unwrap());

        let stmts = executor.statements();
        assert_eq!(
            "INSERT INTO `violation` (`ViolationType`, `FineAmount`) VALUES (?, ?)",
            stmts[0].text()
        );
        assert_eq!(
            &[ScalarValue::from("Speeding"), ScalarValue::Float64(150.0)],
            stmts[0].params()
        );
    }

    #[tokio::test]
    async fn create_rejects_mismatched_payload() {
        let (engine, executor) = engine();

        let values = payload([("ViolationType", "Speeding".into()), ("Points", 3.into())]);
        let err = engine.create("violation", &values).await.unwrap_err();
        match err {
            EngineError::PayloadShape {
                missing,
                unexpected,
                ..
            } => {
                assert_eq!(vec!["FineAmount".to_string()], missing);
                assert_eq!(vec!["Points".to_string()], unexpected);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(executor.statements().is_empty());
    }

    #[tokio::test]
    async fn create_ignores_blank_generated_key() {
        let (engine, executor) = engine();
        executor.push_ok(ExecuteResult::affected(1));

        let values = payload([
            ("ViolationID", "".into()),
            ("ViolationType", "Parking".into()),
            ("FineAmount", 40.into()),
        ]);
        assert!(engine.create("violation", &values).await.unwrap());
        assert_eq!(2, executor.statements()[0].params().len());

        // A non-blank generated key is still rejected.
        let values = payload([
            ("ViolationID", 9.into()),
            ("ViolationType", "Parking".into()),
            ("FineAmount", 40.into()),
        ]);
        let err = engine.create("violation", &values).await.unwrap_err();
        assert!(matches!(err, EngineError::PayloadShape { .. }));
    }

    #[tokio::test]
    async fn create_failure_is_false() {
        let (engine, executor) = engine();
        executor.push_err("Cannot add or update a child row: a foreign key constraint fails");

        let values = payload([("RoadID", 5.into()), ("CameraID", 9.into())]);
        assert!(!engine.create("roadcamera", &values).await.unwrap());
    }

    #[tokio::test]
    async fn read_projects_rows() {
        let (engine, executor) = engine();
        executor.push_ok(ExecuteResult::with_rows(
            ["ViolationID", "ViolationType", "FineAmount"],
            vec![vec![1.into(), "Speeding".into(), 150.0.into()]],
        ));

        let records = engine.read("violation").await.unwrap();
        assert_eq!(1, records.len());
        assert_eq!(ScalarValue::from("Speeding"), records[0]["ViolationType"]);
        assert_eq!("SELECT * FROM `violation`", executor.statements()[0].text());
    }

    #[tokio::test]
    async fn read_empty_table() {
        let (engine, _executor) = engine();
        assert!(engine.read("camera").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_failure_does_not_leak_driver_message() {
        let (engine, executor) = engine();
        executor.push_err("Table 'traffic.camera' doesn't exist");

        let err = engine.read("camera").await.unwrap_err();
        assert!(matches!(err, EngineError::Execution(_)));
        assert!(!err.to_string().contains("traffic.camera"));
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    #[tokio::test]
    async fn query_failures_log_driver_message() {
        let (engine, executor) = engine();
        let (logs, _guard) = capture_logs();

        executor.push_err("no such table: violation");
        let err = engine.read("violation").await.unwrap_err();
        assert!(matches!(err, EngineError::Execution(_)));
        assert!(!err.to_string().contains("no such table"));

        executor.push_err("disk I/O error");
        engine.count("camera").await.unwrap_err();

        executor.push_err("lock wait timeout");
        engine.exists("road", &[1.into()]).await.unwrap_err();

        executor.push_err("unknown database 'traffic'");
        engine.columns_for("vehicle").await.unwrap_err();

        let text = logs.text();
        for expected in [
            "no such table: violation",
            "disk I/O error",
            "lock wait timeout",
            "unknown database 'traffic'",
        ] {
            assert!(text.contains(expected), "missing {expected:?} in {text}");
        }
        assert!(text.contains("WARN"));
    }

    #[tokio::test]
    async fn empty_update_issues_no_sql() {
        let (engine, executor) = engine();

        let err = engine
            .update("violation", &[1.into()], &RecordPayload::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyUpdate(t) if t == "violation"));
        assert!(executor.statements().is_empty());
    }

    #[tokio::test]
    async fn update_set_params_before_key_params() {
        let (engine, executor) = engine();
        executor.push_ok(violation_columns());
        executor.push_ok(ExecuteResult::affected(1));

        let values = payload([("fineamount", 200.0.into()), ("ViolationType", "Reckless".into())]);
        assert!(engine.update("violation", &[4.into()], &values).await.unwrap());

        let stmts = executor.statements();
        assert_eq!(2, stmts.len());
        assert_eq!(
            "UPDATE `violation` SET `FineAmount` = ?, `ViolationType` = ? WHERE `ViolationID` = ?",
            stmts[1].text()
        );
        assert_eq!(
            &[
                ScalarValue::Float64(200.0),
                ScalarValue::from("Reckless"),
                ScalarValue::Int64(4)
            ],
            stmts[1].params()
        );
    }

    #[tokio::test]
    async fn update_no_match_is_false() {
        let (engine, executor) = engine();
        executor.push_ok(violation_columns());
        executor.push_ok(ExecuteResult::affected(0));

        let values = payload([("FineAmount", 10.into())]);
        assert!(!engine.update("violation", &[999.into()], &values).await.unwrap());
    }

    #[tokio::test]
    async fn update_unknown_column() {
        let (engine, executor) = engine();
        executor.push_ok(violation_columns());

        let values = payload([("FineAmount = 0 WHERE 1 = 1 --", 10.into())]);
        let err = engine
            .update("violation", &[1.into()], &values)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownColumn { .. }));
        // Only the metadata query ran.
        assert_eq!(1, executor.statements().len());
    }

    #[tokio::test]
    async fn update_checks_key_arity() {
        let (engine, executor) = engine();

        let values = payload([("CameraID", 2.into())]);
        let err = engine
            .update("roadcamera", &[1.into()], &values)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::KeyArity {
                expected: 2,
                got: 1,
                ..
            }
        ));
        assert!(executor.statements().is_empty());
    }

    #[tokio::test]
    async fn delete_composite_key_order() {
        let (engine, executor) = engine();
        executor.push_ok(ExecuteResult::affected(1));

        assert!(engine.delete("roadcamera", &[5.into(), 9.into()]).await.unwrap());

        let stmts = executor.statements();
        assert_eq!(
            "DELETE FROM `roadcamera` WHERE `RoadID` = ? AND `CameraID` = ?",
            stmts[0].text()
        );
        assert_eq!(&[ScalarValue::Int64(5), ScalarValue::Int64(9)], stmts[0].params());
    }

    #[tokio::test]
    async fn delete_twice() {
        let (engine, executor) = engine();
        executor.push_ok(ExecuteResult::affected(1));
        executor.push_ok(ExecuteResult::affected(0));

        assert!(engine.delete("road", &[3.into()]).await.unwrap());
        assert!(!engine.delete("road", &[3.into()]).await.unwrap());
    }

    #[tokio::test]
    async fn count_and_exists() {
        let (engine, executor) = engine();
        executor.push_ok(ExecuteResult::with_rows(["COUNT(*)"], vec![vec![12.into()]]));
        executor.push_ok(ExecuteResult::with_rows(["COUNT(*)"], vec![vec![0.into()]]));

        assert_eq!(12, engine.count("accident").await.unwrap());
        assert!(!engine
            .exists("vehicleviolation", &[1.into(), 2.into()])
            .await
            .unwrap());

        let stmts = executor.statements();
        assert_eq!(
            "SELECT COUNT(*) FROM `vehicleviolation` WHERE `VehicleID` = ? AND `ViolationID` = ?",
            stmts[1].text()
        );
    }

    #[tokio::test]
    async fn sqlite_dialect_quoting() {
        logutil::init_test();
        let executor = Arc::new(RecordingExecutor::with_dialect(Dialect::Sqlite));
        let engine = CrudEngine::traffic(executor.clone());

        engine.read("user").await.unwrap();
        assert_eq!("SELECT * FROM \"user\"", executor.statements()[0].text());
    }
}
