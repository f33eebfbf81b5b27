pub mod errors;

use std::fmt;
use std::path::{Path, PathBuf};

use async_sqlite::rusqlite::params_from_iter;
use async_sqlite::rusqlite::types::Value;
use async_trait::async_trait;
use tracing::{debug, trace};
use trafficdb_core::scalar::{DATE_FORMAT, TIMESTAMP_FORMAT, TIME_FORMAT};
use trafficdb_core::{Dialect, ExecuteResult, ExecutionError, ScalarValue, SqlExecutor, Statement};

use errors::{Result, SqliteError};

const IN_MEMORY: &str = ":memory:";

/// Executor backed by an embedded sqlite database.
///
/// All statements run on the client's single background connection, so
/// access is serialized without extra locking.
#[derive(Clone)]
pub struct SqliteExecutor {
    path: PathBuf,
    inner: async_sqlite::Client,
}

impl fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SqliteExecutor({})", self.path.to_string_lossy())
    }
}

impl SqliteExecutor {
    /// Open (or create) a database file with foreign keys enforced.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = async_sqlite::ClientBuilder::new()
            .path(&path)
            .open()
            .await?;
        inner
            .conn(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"))
            .await?;

        debug!(path = %path.display(), "opened sqlite database");
        Ok(Self { path, inner })
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> Result<Self> {
        Self::open(IN_MEMORY).await
    }

    /// Create the traffic tables if they don't exist yet.
    pub async fn bootstrap_traffic_schema(&self) -> Result<()> {
        self.inner
            .conn(|conn| conn.execute_batch(include_str!("schema.sql")))
            .await?;
        Ok(())
    }

    async fn execute_inner(&self, statement: &Statement) -> Result<ExecuteResult> {
        let sql = statement.text().to_string();
        let params = statement
            .params()
            .iter()
            .enumerate()
            .map(|(index, v)| scalar_to_sqlite(index, v))
            .collect::<Result<Vec<_>>>()?;
        trace!(query = %statement, ?params);

        if statement.is_mutation() {
            let rows_affected = self
                .inner
                .conn_mut(move |conn| {
                    // Rolled back on drop if commit is never reached.
                    let tx = conn.transaction()?;
                    let n = tx.execute(&sql, params_from_iter(params.iter()))?;
                    tx.commit()?;
                    Ok(n)
                })
                .await?;

            Ok(ExecuteResult::affected(rows_affected as u64))
        } else {
            let (columns, rows) = self
                .inner
                .conn(move |conn| {
                    let mut stmt = conn.prepare(&sql)?;
                    let columns = stmt
                        .column_names()
                        .into_iter()
                        .map(String::from)
                        .collect::<Vec<_>>();
                    let num_cols = columns.len();

                    let rows = stmt
                        .query(params_from_iter(params.iter()))?
                        .mapped(|r| {
                            (0..num_cols)
                                .map(|idx| r.get::<_, Value>(idx))
                                .collect::<Result<Vec<_>, _>>()
                        })
                        .collect::<Result<Vec<_>, _>>()?;

                    Ok((columns, rows))
                })
                .await?;

            let rows = rows
                .into_iter()
                .map(|row| row.into_iter().map(sqlite_to_scalar).collect())
                .collect();

            Ok(ExecuteResult::with_rows(columns, rows))
        }
    }
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&self, statement: &Statement) -> Result<ExecuteResult, ExecutionError> {
        self.execute_inner(statement)
            .await
            .map_err(ExecutionError::new)
    }

    async fn close(&self) -> Result<(), ExecutionError> {
        self.inner
            .close()
            .await
            .map_err(|e| ExecutionError::new(SqliteError::from(e)))
    }
}

fn scalar_to_sqlite(index: usize, value: &ScalarValue) -> Result<Value> {
    Ok(match value {
        ScalarValue::Null => Value::Null,
        ScalarValue::Boolean(v) => Value::Integer(i64::from(*v)),
        ScalarValue::Int64(v) => Value::Integer(*v),
        ScalarValue::UInt64(v) => {
            Value::Integer(i64::try_from(*v).map_err(|_| SqliteError::UnsupportedParam {
                index,
                reason: format!("{v} is out of range for a sqlite integer"),
            })?)
        }
        ScalarValue::Float64(v) => Value::Real(*v),
        // Stored as text. Numeric column affinity converts it on insert.
        ScalarValue::Decimal(v) => Value::Text(v.to_string()),
        ScalarValue::Utf8(v) => Value::Text(v.clone()),
        ScalarValue::Binary(v) => Value::Blob(v.clone()),
        ScalarValue::Date(v) => Value::Text(v.format(DATE_FORMAT).to_string()),
        ScalarValue::Time(v) => Value::Text(v.format(TIME_FORMAT).to_string()),
        ScalarValue::Timestamp(v) => Value::Text(v.format(TIMESTAMP_FORMAT).to_string()),
    })
}

fn sqlite_to_scalar(value: Value) -> ScalarValue {
    match value {
        Value::Null => ScalarValue::Null,
        Value::Integer(v) => ScalarValue::Int64(v),
        Value::Real(v) => ScalarValue::Float64(v),
        Value::Text(v) => ScalarValue::Utf8(v),
        Value::Blob(v) => ScalarValue::Binary(v),
    }
}
