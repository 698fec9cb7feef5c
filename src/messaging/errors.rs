use thiserror::Error;

/// Errors surfaced by the broker client, router, and supervisor.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Broker connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Consume failed: {0}")]
    Consume(String),

    #[error("Queue setup failed: {0}")]
    Setup(String),

    #[error("Event decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}
