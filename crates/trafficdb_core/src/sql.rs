//! Statement text generation.
//!
//! Builders only accept [`Ident`]s and descriptors, never plain strings, and
//! every value is a `?` placeholder.

use crate::catalog::TableDescriptor;
use crate::executor::{Dialect, Statement, StatementKind};
use crate::ident::Ident;
use crate::scalar::ScalarValue;

fn quoted_list<'a>(dialect: Dialect, idents: impl IntoIterator<Item = &'a Ident>) -> String {
    idents
        .into_iter()
        .map(|i| dialect.quote_identifier(i.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn assignments<'a>(dialect: Dialect, idents: impl IntoIterator<Item = &'a Ident>, sep: &str) -> String {
    idents
        .into_iter()
        .map(|i| format!("{} = ?", dialect.quote_identifier(i.as_str())))
        .collect::<Vec<_>>()
        .join(sep)
}

fn where_primary_key(dialect: Dialect, table: &TableDescriptor) -> String {
    assignments(dialect, table.primary_key(), " AND ")
}

/// `INSERT INTO t (c1, c2) VALUES (?, ?)`, columns in insert order.
pub(crate) fn insert(dialect: Dialect, table: &TableDescriptor, params: Vec<ScalarValue>) -> Statement {
    let cols = table.insert_columns();
    let mut text = format!(
        "INSERT INTO {} ({}) VALUES (",
        dialect.quote_identifier(table.name().as_str()),
        quoted_list(dialect, cols),
    );
    for idx in 0..cols.len() {
        if idx > 0 {
            text.push_str(", ");
        }
        text.push('?');
    }
    text.push(')');

    Statement::generated(text, params, StatementKind::Mutation)
}

pub(crate) fn select_all(dialect: Dialect, table: &TableDescriptor) -> Statement {
    let text = format!(
        "SELECT * FROM {}",
        dialect.quote_identifier(table.name().as_str())
    );
    Statement::generated(text, Vec::new(), StatementKind::Query)
}

pub(crate) fn count(dialect: Dialect, table: &TableDescriptor) -> Statement {
    let text = format!(
        "SELECT COUNT(*) FROM {}",
        dialect.quote_identifier(table.name().as_str())
    );
    Statement::generated(text, Vec::new(), StatementKind::Query)
}

pub(crate) fn count_by_key(
    dialect: Dialect,
    table: &TableDescriptor,
    key_values: Vec<ScalarValue>,
) -> Statement {
    let text = format!(
        "SELECT COUNT(*) FROM {} WHERE {}",
        dialect.quote_identifier(table.name().as_str()),
        where_primary_key(dialect, table),
    );
    Statement::generated(text, key_values, StatementKind::Query)
}

/// `UPDATE t SET a = ?, b = ? WHERE pk1 = ? AND pk2 = ?`.
///
/// `params` must be the SET values followed by the key values, matching
/// placeholder order.
pub(crate) fn update(
    dialect: Dialect,
    table: &TableDescriptor,
    set_columns: &[&Ident],
    params: Vec<ScalarValue>,
) -> Statement {
    let text = format!(
        "UPDATE {} SET {} WHERE {}",
        dialect.quote_identifier(table.name().as_str()),
        assignments(dialect, set_columns.iter().copied(), ", "),
        where_primary_key(dialect, table),
    );
    Statement::generated(text, params, StatementKind::Mutation)
}

pub(crate) fn delete(dialect: Dialect, table: &TableDescriptor, key_values: Vec<ScalarValue>) -> Statement {
    let text = format!(
        "DELETE FROM {} WHERE {}",
        dialect.quote_identifier(table.name().as_str()),
        where_primary_key(dialect, table),
    );
    Statement::generated(text, key_values, StatementKind::Mutation)
}
