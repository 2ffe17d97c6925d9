//! Error types for registry clients

use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connecting, writing, reading or decoding failed. The master's answer,
    /// if any, is unknown.
    #[error("Communication error with master {address}: {message}")]
    Communication { address: String, message: String },

    /// The master answered with an error other than "not found"
    #[error("Master rejected request: {0}")]
    Rejected(String),

    /// The request failed local validation and was not sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    pub(crate) fn communication(address: &str, message: impl std::fmt::Display) -> Self {
        Self::Communication {
            address: address.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failure of [`launch`](crate::launch)
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Registration of {identity} failed: {source}")]
    Registration {
        identity: String,
        #[source]
        source: ClientError,
    },

    #[error("Master refused registration of {0}")]
    RegistrationRefused(String),

    #[error("Service {identity} stopped with error: {source}")]
    Service {
        identity: String,
        #[source]
        source: anyhow::Error,
    },
}
