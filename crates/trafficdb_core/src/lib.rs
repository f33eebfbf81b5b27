//! Schema catalog and generic CRUD engine for the traffic incident database.
//!
//! The engine is given a table name and nothing else. Primary keys come from
//! the static [`catalog::Catalog`], columns are discovered from the live
//! database, and statements are run through a [`executor::SqlExecutor`].

pub mod catalog;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod ident;
pub mod projector;
pub mod scalar;

mod sql;

#[cfg(test)]
mod testutil;

pub use catalog::{Catalog, ColumnSet, TableDescriptor};
pub use engine::{CrudEngine, RecordPayload};
pub use errors::{EngineError, ExecutionError, Result};
pub use executor::{Dialect, ExecuteResult, SqlExecutor, Statement, StatementKind};
pub use projector::Record;
pub use scalar::ScalarValue;
