use crate::mysql::errors::MysqlError;
use crate::sqlite::errors::SqliteError;

#[derive(Debug, thiserror::Error)]
pub enum DatasourceError {
    #[error("MySQL: {0}")]
    Mysql(#[from] MysqlError),

    #[error("SQLite: {0}")]
    Sqlite(#[from] SqliteError),
}

pub type Result<T, E = DatasourceError> = std::result::Result<T, E>;
