#[derive(Debug, thiserror::Error)]
pub enum SqliteError {
    #[error(transparent)]
    AsyncSqlite(#[from] async_sqlite::Error),

    #[error(transparent)]
    Rusqlite(#[from] async_sqlite::rusqlite::Error),

    #[error("Unable to convert value for parameter {index}: {reason}")]
    UnsupportedParam { index: usize, reason: String },
}

pub type Result<T, E = SqliteError> = std::result::Result<T, E>;
