use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;

use crate::errors::ExecutionError;
use crate::scalar::ScalarValue;

/// SQL flavor of the connected database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    /// Quote an identifier, doubling any embedded quote characters.
    pub fn quote_identifier(&self, ident: &str) -> String {
        let quote = match self {
            Dialect::MySql => '`',
            Dialect::Sqlite => '"',
        };

        let mut out = String::with_capacity(ident.len() + 2);
        out.push(quote);
        for c in ident.chars() {
            if c == quote {
                out.push(quote);
            }
            out.push(c);
        }
        out.push(quote);
        out
    }

    /// Query listing a table's columns in declaration order. Takes the table
    /// name as its only parameter.
    pub fn columns_query(&self) -> &'static str {
        match self {
            Dialect::MySql => {
                "SELECT COLUMN_NAME FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = ? \
                 ORDER BY ordinal_position"
            }
            Dialect::Sqlite => "SELECT name FROM pragma_table_info(?) ORDER BY cid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Read only. Never committed.
    Query,
    /// Modifies data. Committed on success, rolled back on failure.
    Mutation,
}

/// Statement text along with its bound parameters.
///
/// Only compile time strings can be used with the public constructors. Text
/// containing identifiers is built inside this crate from catalog data.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    text: Cow<'static, str>,
    params: Vec<ScalarValue>,
    kind: StatementKind,
}

impl Statement {
    pub fn query(text: &'static str, params: Vec<ScalarValue>) -> Self {
        Statement {
            text: Cow::Borrowed(text),
            params,
            kind: StatementKind::Query,
        }
    }

    pub fn mutation(text: &'static str, params: Vec<ScalarValue>) -> Self {
        Statement {
            text: Cow::Borrowed(text),
            params,
            kind: StatementKind::Mutation,
        }
    }

    pub(crate) fn generated(text: String, params: Vec<ScalarValue>, kind: StatementKind) -> Self {
        Statement {
            text: Cow::Owned(text),
            params,
            kind,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[ScalarValue] {
        &self.params
    }

    pub fn is_mutation(&self) -> bool {
        self.kind == StatementKind::Mutation
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Everything produced by a single statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ScalarValue>>,
}

impl ExecuteResult {
    pub fn with_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<ScalarValue>>,
    ) -> Self {
        ExecuteResult {
            rows_affected: 0,
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    pub fn affected(rows_affected: u64) -> Self {
        ExecuteResult {
            rows_affected,
            ..Default::default()
        }
    }
}

/// Runs statements against a single database connection.
///
/// Implementations must serialize access to their connection, and must not
/// hold on to it after `execute` returns, whichever way it returns.
#[async_trait]
pub trait SqlExecutor: Send + Sync + fmt::Debug {
    fn dialect(&self) -> Dialect;

    async fn execute(&self, statement: &Statement) -> Result<ExecuteResult, ExecutionError>;

    /// Disconnect from the database. Further calls to `execute` error.
    async fn close(&self) -> Result<(), ExecutionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_identifiers() {
        assert_eq!("`RoadID`", Dialect::MySql.quote_identifier("RoadID"));
        assert_eq!("\"user\"", Dialect::Sqlite.quote_identifier("user"));
        assert_eq!("`a``b`", Dialect::MySql.quote_identifier("a`b"));
        assert_eq!("\"a\"\"b\"", Dialect::Sqlite.quote_identifier("a\"b"));
    }
}
