use thiserror::Error;

/// Crate-wide error type for service bootstrap and cross-cutting failures.
///
/// The messaging layer and web layer carry their own error types
/// ([`crate::messaging::BrokerError`], [`crate::web::errors::ApiError`]);
/// this enum is what the service binaries and configuration loading report.
#[derive(Debug, Error)]
pub enum TeamflowError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Broker error: {0}")]
    Broker(#[from] crate::messaging::BrokerError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for TeamflowError {
    fn from(err: config::ConfigError) -> Self {
        TeamflowError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TeamflowError>;
