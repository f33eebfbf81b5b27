pub mod errors;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use mysql_async::consts::ColumnType;
use mysql_async::prelude::Queryable;
use mysql_async::{
    Column as MysqlColumn, Conn, Opts, OptsBuilder, Params, Row as MysqlRow, TxOpts,
    Value as MysqlValue,
};
use tokio::sync::Mutex;
use tracing::{debug, trace};
use trafficdb_core::{Dialect, ExecuteResult, ExecutionError, ScalarValue, SqlExecutor, Statement};

use errors::{MysqlError, Result};

/// Character set id MySQL reports for binary strings and blobs.
const BINARY_CHARSET: u16 = 63;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MysqlDbConnection {
    ConnectionString(String),
    Parameters {
        host: String,
        port: Option<u16>,
        user: String,
        password: Option<String>,
        database: String,
    },
}

impl MysqlDbConnection {
    pub fn connection_string(&self) -> String {
        match self {
            Self::ConnectionString(s) => s.to_owned(),
            Self::Parameters {
                host,
                port,
                user,
                password,
                database,
            } => {
                let credentials = match password {
                    Some(password) => format!("{user}:{password}"),
                    None => user.clone(),
                };
                let address = match port {
                    Some(port) => format!("{host}:{port}"),
                    None => host.clone(),
                };
                format!("mysql://{credentials}@{address}/{database}")
            }
        }
    }
}

/// Executor backed by a single MySQL connection.
///
/// The connection sits behind an async mutex, so statements run one at a time
/// and the guard is released before `execute` returns.
#[derive(Debug)]
pub struct MysqlExecutor {
    conn: Mutex<Option<Conn>>,
}

impl MysqlExecutor {
    /// Connect to a mysql instance.
    pub async fn connect(connection: &MysqlDbConnection) -> Result<Self> {
        let opts = Opts::from_url(&connection.connection_string())?;
        // Report matched rather than changed rows for UPDATE, so updating a
        // row to its current values still counts as a match.
        let opts: Opts = OptsBuilder::from_opts(opts).client_found_rows(true).into();

        let conn = Conn::new(opts).await?;
        debug!(connection_id = conn.id(), "connected to mysql");

        Ok(MysqlExecutor {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Check that the connection is usable.
    pub async fn validate_connection(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(MysqlError::Closed)?;
        conn.query_drop("SELECT 1").await?;
        Ok(())
    }

    /// Create the traffic tables if they don't exist yet.
    pub async fn bootstrap_traffic_schema(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(MysqlError::Closed)?;

        for ddl in include_str!("schema.sql")
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            conn.query_drop(ddl).await?;
        }
        Ok(())
    }

    async fn execute_inner(&self, statement: &Statement) -> Result<ExecuteResult> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(MysqlError::Closed)?;

        let params = to_mysql_params(statement.params());
        trace!(query = %statement, ?params);

        if statement.is_mutation() {
            // Dropping an uncommitted transaction rolls it back.
            let mut tx = conn.start_transaction(TxOpts::default()).await?;
            tx.exec_drop(statement.text(), params).await?;
            let rows_affected = tx.affected_rows();
            tx.commit().await?;

            Ok(ExecuteResult::affected(rows_affected))
        } else {
            let mut result = conn.exec_iter(statement.text(), params).await?;
            let cols = result.columns_ref().to_vec();
            let rows: Vec<MysqlRow> = result.collect_and_drop().await?;

            let rows = rows
                .into_iter()
                .map(|row| mysql_row_to_scalars(row, &cols))
                .collect::<Result<Vec<_>>>()?;

            Ok(ExecuteResult {
                rows_affected: 0,
                columns: cols.iter().map(|c| c.name_str().into_owned()).collect(),
                rows,
            })
        }
    }
}

#[async_trait]
impl SqlExecutor for MysqlExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn execute(&self, statement: &Statement) -> Result<ExecuteResult, ExecutionError> {
        self.execute_inner(statement)
            .await
            .map_err(ExecutionError::new)
    }

    async fn close(&self) -> Result<(), ExecutionError> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.disconnect()
                .await
                .map_err(|e| ExecutionError::new(MysqlError::from(e)))?;
        }
        Ok(())
    }
}

fn to_mysql_params(params: &[ScalarValue]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(params.iter().map(scalar_to_mysql).collect())
}

fn scalar_to_mysql(value: &ScalarValue) -> MysqlValue {
    match value {
        ScalarValue::Null => MysqlValue::NULL,
        ScalarValue::Boolean(v) => MysqlValue::Int(i64::from(*v)),
        ScalarValue::Int64(v) => MysqlValue::Int(*v),
        ScalarValue::UInt64(v) => MysqlValue::UInt(*v),
        ScalarValue::Float64(v) => MysqlValue::Double(*v),
        ScalarValue::Decimal(v) => MysqlValue::Bytes(v.to_string().into_bytes()),
        ScalarValue::Utf8(v) => MysqlValue::Bytes(v.clone().into_bytes()),
        ScalarValue::Binary(v) => MysqlValue::Bytes(v.clone()),
        ScalarValue::Date(d) => MysqlValue::Date(
            d.year() as u16,
            d.month() as u8,
            d.day() as u8,
            0,
            0,
            0,
            0,
        ),
        ScalarValue::Time(t) => MysqlValue::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1_000,
        ),
        ScalarValue::Timestamp(ts) => MysqlValue::Date(
            ts.year() as u16,
            ts.month() as u8,
            ts.day() as u8,
            ts.hour() as u8,
            ts.minute() as u8,
            ts.second() as u8,
            ts.nanosecond() / 1_000,
        ),
    }
}

fn mysql_row_to_scalars(mut row: MysqlRow, cols: &[MysqlColumn]) -> Result<Vec<ScalarValue>> {
    cols.iter()
        .enumerate()
        .map(|(idx, col)| {
            let value: MysqlValue = row.take(idx).unwrap_or(MysqlValue::NULL);
            mysql_value_to_scalar(value, col)
        })
        .collect()
}

/// Convert a value from the binary protocol, using the column definition to
/// tell dates from datetimes and text from binary strings.
fn mysql_value_to_scalar(value: MysqlValue, col: &MysqlColumn) -> Result<ScalarValue> {
    use ColumnType::*;

    let unsupported = |what: String| MysqlError::UnsupportedValue(col.name_str().into_owned(), what);

    Ok(match value {
        MysqlValue::NULL => ScalarValue::Null,
        MysqlValue::Int(v) => ScalarValue::Int64(v),
        MysqlValue::UInt(v) => ScalarValue::UInt64(v),
        MysqlValue::Float(v) => ScalarValue::Float64(f64::from(v)),
        MysqlValue::Double(v) => ScalarValue::Float64(v),
        MysqlValue::Date(year, month, day, hour, min, sec, micros) => {
            let date = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
                .ok_or_else(|| unsupported(format!("{year}-{month}-{day}")))?;
            if col.column_type() == MYSQL_TYPE_DATE {
                ScalarValue::Date(date)
            } else {
                let time = NaiveTime::from_hms_micro_opt(
                    u32::from(hour),
                    u32::from(min),
                    u32::from(sec),
                    micros,
                )
                .ok_or_else(|| unsupported(format!("{hour}:{min}:{sec}.{micros}")))?;
                ScalarValue::Timestamp(NaiveDateTime::new(date, time))
            }
        }
        MysqlValue::Time(negative, days, hour, min, sec, micros) => {
            if negative || days > 0 {
                // Durations outside a single day have no NaiveTime
                // representation.
                let sign = if negative { "-" } else { "" };
                let hours = days * 24 + u32::from(hour);
                ScalarValue::Utf8(format!("{sign}{hours:02}:{min:02}:{sec:02}"))
            } else {
                let time = NaiveTime::from_hms_micro_opt(
                    u32::from(hour),
                    u32::from(min),
                    u32::from(sec),
                    micros,
                )
                .ok_or_else(|| unsupported(format!("{hour}:{min}:{sec}.{micros}")))?;
                ScalarValue::Time(time)
            }
        }
        MysqlValue::Bytes(bytes) => match col.column_type() {
            MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL => {
                let s = String::from_utf8(bytes)?;
                ScalarValue::Decimal(s.parse()?)
            }
            _ if col.character_set() == BINARY_CHARSET => ScalarValue::Binary(bytes),
            _ => ScalarValue::Utf8(String::from_utf8(bytes)?),
        },
    })
}
