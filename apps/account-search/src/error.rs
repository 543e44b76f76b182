//! Error types for account search

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Postgres SQLSTATE raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed filter value: {0}")]
    MalformedFilterValue(String),

    #[error("Account store timed out: {0}")]
    StoreTimeout(String),

    #[error("Account store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => Error::StoreTimeout(err.to_string()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                Error::StoreTimeout(db.message().to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Protocol(_) => Error::StoreUnavailable(err.to_string()),
            _ => Error::Database(err),
        }
    }
}

impl Error {
    /// True for failures of the backing store round-trip itself.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Error::StoreTimeout(_) | Error::StoreUnavailable(_) | Error::Database(_)
        )
    }
}
