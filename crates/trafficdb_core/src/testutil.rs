//! Executor that records statements instead of running them.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::ExecutionError;
use crate::executor::{Dialect, ExecuteResult, SqlExecutor, Statement};

#[derive(Debug)]
pub struct RecordingExecutor {
    dialect: Dialect,
    statements: Mutex<Vec<Statement>>,
    /// Responses handed out in order. Empty results once exhausted.
    responses: Mutex<VecDeque<Result<ExecuteResult, String>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::with_dialect(Dialect::MySql)
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        RecordingExecutor {
            dialect,
            statements: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_ok(&self, result: ExecuteResult) {
        self.responses.lock().push_back(Ok(result));
    }

    pub fn push_err(&self, msg: impl Into<String>) {
        self.responses.lock().push_back(Err(msg.into()));
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().clone()
    }
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&self, statement: &Statement) -> Result<ExecuteResult, ExecutionError> {
        self.statements.lock().push(statement.clone());
        match self.responses.lock().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(msg)) => Err(ExecutionError::new(msg)),
            None => Ok(ExecuteResult::default()),
        }
    }
}
