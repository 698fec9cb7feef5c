//! Fire-and-forget event producer.
//!
//! Producers publish only after their local commit has succeeded, and a
//! failed publish never affects the committed write: failures are logged and
//! swallowed. That makes delivery at-most-once from the producer's side —
//! there is no outbox and no retry. Cross-service state converges through
//! the consumers, not through publish guarantees.

use serde::Serialize;
use tracing::{debug, error};

use crate::events::EventEnvelope;
use crate::messaging::BrokerClient;

#[derive(Clone)]
pub struct EventPublisher {
    client: BrokerClient,
}

impl EventPublisher {
    pub fn new(client: BrokerClient) -> Self {
        Self { client }
    }

    /// Publish a domain event. Never returns an error: the caller's local
    /// write has already committed and must not be rolled back or retried
    /// because a notification could not be sent.
    pub async fn publish<T: Serialize>(&self, exchange: &str, routing_key: &str, payload: &T) {
        let envelope = match EventEnvelope::new(routing_key, payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(routing_key = %routing_key, error = %e, "failed to encode event payload");
                return;
            }
        };

        let body = match serde_json::to_vec(&envelope) {
            Ok(body) => body,
            Err(e) => {
                error!(routing_key = %routing_key, error = %e, "failed to serialize event");
                return;
            }
        };

        match self.client.publish(exchange, routing_key, &body).await {
            Ok(()) => {
                debug!(exchange = %exchange, routing_key = %routing_key, "event published");
            }
            Err(e) => {
                error!(
                    exchange = %exchange,
                    routing_key = %routing_key,
                    error = %e,
                    "failed to publish event"
                );
            }
        }
    }
}
