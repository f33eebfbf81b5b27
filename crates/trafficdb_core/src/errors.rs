use std::error::Error as StdError;

/// Failure reported by a `SqlExecutor`.
///
/// Display never includes driver output. The driver error is only reachable
/// through `source` and `driver_message`.
#[derive(Debug, thiserror::Error)]
#[error("Failed to execute statement")]
pub struct ExecutionError {
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl ExecutionError {
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        ExecutionError {
            source: source.into(),
        }
    }

    /// Message from the underlying driver. For logs only.
    pub fn driver_message(&self) -> String {
        self.source.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Table '{0}' is not supported")]
    UnsupportedTable(String),

    #[error("Table '{0}' is not registered in the catalog")]
    UnknownTable(String),

    #[error("Table '{0}' does not exist in the connected database")]
    SchemaFetch(String),

    #[error("No values provided to update in table '{0}'")]
    EmptyUpdate(String),

    #[error(
        "Values for table '{table}' do not match its columns (missing: {missing:?}, unexpected: {unexpected:?})"
    )]
    PayloadShape {
        table: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Table '{table}' expects {expected} key value(s), got {got}")]
    KeyArity {
        table: String,
        expected: usize,
        got: usize,
    },

    #[error("Column '{column}' does not exist in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Unexpected result from database: {0}")]
    UnexpectedResult(String),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
