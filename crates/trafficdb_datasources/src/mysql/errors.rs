#[derive(Debug, thiserror::Error)]
pub enum MysqlError {
    #[error("Connection to MySQL is closed")]
    Closed,

    #[error("Unable to convert mysql value for column {0}: {1}")]
    UnsupportedValue(String, String),

    #[error(transparent)]
    Mysql(#[from] mysql_async::Error),

    #[error(transparent)]
    ConnectionUrl(#[from] mysql_async::UrlError),

    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Decimal(#[from] rust_decimal::Error),
}

pub type Result<T, E = MysqlError> = std::result::Result<T, E>;
