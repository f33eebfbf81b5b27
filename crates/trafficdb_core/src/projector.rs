use indexmap::IndexMap;

use crate::executor::ExecuteResult;
use crate::scalar::ScalarValue;

/// A row keyed by column name, in result column order.
pub type Record = IndexMap<String, ScalarValue>;

/// Turn raw rows into records.
///
/// Rows shorter than the column list are padded with nulls.
pub fn project(result: ExecuteResult) -> Vec<Record> {
    let ExecuteResult { columns, rows, .. } = result;

    rows.into_iter()
        .map(|row| {
            let mut values = row.into_iter();
            columns
                .iter()
                .map(|col| (col.clone(), values.next().unwrap_or(ScalarValue::Null)))
                .collect()
        })
        .collect()
}

/// First column of the first row, if any.
pub fn first_scalar(result: &ExecuteResult) -> Option<&ScalarValue> {
    result.rows.first().and_then(|row| row.first())
}
