use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Framing error: {0}")]
    Framing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                match code.as_ref() {
                    // PostgreSQL check_violation
                    "23514" => Self::MalformedRequest("record violates a storage constraint".to_string()),
                    // PostgreSQL not_null_violation
                    "23502" => Self::MalformedRequest("required field is missing".to_string()),
                    _ => Self::StoreUnavailable(err.to_string()),
                }
            }
            sqlx::Error::PoolTimedOut => {
                Self::StoreUnavailable("timed out acquiring a database connection".to_string())
            }
            sqlx::Error::PoolClosed => Self::StoreUnavailable("database pool is closed".to_string()),
            _ => Self::StoreUnavailable(err.to_string()),
        }
    }
}

impl From<crate::validation::ValidationError> for Error {
    fn from(err: crate::validation::ValidationError) -> Self {
        Self::MalformedRequest(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
