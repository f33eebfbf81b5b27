//! SQL executors for the databases trafficdb can run against.

pub mod errors;
pub mod mysql;
pub mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use trafficdb_core::SqlExecutor;

use errors::Result;
use mysql::{MysqlDbConnection, MysqlExecutor};
use sqlite::SqliteExecutor;

/// Where the traffic database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Mysql(MysqlDbConnection),
    Sqlite(PathBuf),
}

impl DatabaseConfig {
    /// Open a connection and check that it's usable.
    pub async fn connect(&self) -> Result<Arc<dyn SqlExecutor>> {
        self.open(false).await
    }

    /// Open a connection, creating the traffic tables if they're missing.
    pub async fn connect_and_bootstrap(&self) -> Result<Arc<dyn SqlExecutor>> {
        self.open(true).await
    }

    async fn open(&self, bootstrap: bool) -> Result<Arc<dyn SqlExecutor>> {
        let executor: Arc<dyn SqlExecutor> = match self {
            Self::Mysql(conn) => {
                let executor = MysqlExecutor::connect(conn).await?;
                executor.validate_connection().await?;
                if bootstrap {
                    executor.bootstrap_traffic_schema().await?;
                    info!("created traffic schema");
                }
                Arc::new(executor)
            }
            Self::Sqlite(path) => {
                let executor = SqliteExecutor::open(path).await?;
                if bootstrap {
                    executor.bootstrap_traffic_schema().await?;
                    info!(path = %path.display(), "created traffic schema");
                }
                Arc::new(executor)
            }
        };
        Ok(executor)
    }
}
