//! Topic routing: durable queue declaration, pattern binding, and dispatch
//! of inbound deliveries to a single callback.
//!
//! Delivery semantics are at-least-once: the message is acked only after the
//! handler returns `Ok`, and nacked (requeue left to broker policy) when the
//! handler fails. Consumers must therefore be idempotent.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    message::Delivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicRejectOptions,
        QueueBindOptions, QueueDeclareOptions,
    },
    types::{AMQPValue, FieldTable},
};
use tracing::{debug, error, info};

use super::client::BrokerClient;
use super::errors::BrokerError;
use crate::events::EventEnvelope;

/// Retention policy applied to every consumer queue (backpressure bound).
pub const QUEUE_MESSAGE_TTL_MS: u32 = 86_400_000; // 24h
pub const QUEUE_MAX_LENGTH: u32 = 10_000;

/// Callback invoked for each decoded event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &EventEnvelope) -> anyhow::Result<()>;
}

/// A durable queue bound to one exchange under one or more routing-key
/// patterns (`*` matches one segment, `#` matches zero or more).
#[derive(Debug, Clone)]
pub struct QueueSpec {
    pub queue: String,
    pub exchange: String,
    pub bindings: Vec<String>,
}

impl QueueSpec {
    pub fn new(queue: impl Into<String>, exchange: impl Into<String>, bindings: &[&str]) -> Self {
        Self {
            queue: queue.into(),
            exchange: exchange.into(),
            bindings: bindings.iter().map(|b| (*b).to_string()).collect(),
        }
    }

    /// Whether a concrete routing key matches any of this queue's bindings.
    pub fn matches(&self, routing_key: &str) -> bool {
        self.bindings
            .iter()
            .any(|pattern| routing_key_matches(pattern, routing_key))
    }
}

/// Topic-pattern matching with AMQP semantics: segments split on `.`,
/// `*` matches exactly one segment, `#` matches zero or more.
pub fn routing_key_matches(pattern: &str, routing_key: &str) -> bool {
    fn segments_match(pattern: &[&str], key: &[&str]) -> bool {
        match pattern.split_first() {
            None => key.is_empty(),
            Some((&"#", rest)) => (0..=key.len()).any(|skip| segments_match(rest, &key[skip..])),
            Some((&"*", rest)) => !key.is_empty() && segments_match(rest, &key[1..]),
            Some((&literal, rest)) => {
                key.first() == Some(&literal) && segments_match(rest, &key[1..])
            }
        }
    }

    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    segments_match(&pattern, &key)
}

/// Binds one durable queue and feeds decoded envelopes to its handler.
pub struct EventRouter {
    client: BrokerClient,
    spec: QueueSpec,
    handler: Arc<dyn EventHandler>,
}

impl EventRouter {
    pub fn new(client: BrokerClient, spec: QueueSpec, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            client,
            spec,
            handler,
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.spec.queue
    }

    /// Declare the queue, bind all patterns, and consume until the stream
    /// ends or the connection fails. Message-level handler errors stay inside
    /// the loop; only connection-level errors propagate to the supervisor.
    pub async fn run(&self) -> Result<(), BrokerError> {
        let channel = self.client.channel().await?;
        self.client
            .declare_topic_exchange(&channel, &self.spec.exchange)
            .await?;

        let mut arguments = FieldTable::default();
        arguments.insert("x-message-ttl".into(), AMQPValue::LongUInt(QUEUE_MESSAGE_TTL_MS));
        arguments.insert("x-max-length".into(), AMQPValue::LongUInt(QUEUE_MAX_LENGTH));

        channel
            .queue_declare(
                &self.spec.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                arguments,
            )
            .await
            .map_err(|e| {
                BrokerError::Setup(format!("failed to declare queue {}: {e}", self.spec.queue))
            })?;

        for pattern in &self.spec.bindings {
            channel
                .queue_bind(
                    &self.spec.queue,
                    &self.spec.exchange,
                    pattern,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| {
                    BrokerError::Setup(format!(
                        "failed to bind {} to {} with {pattern}: {e}",
                        self.spec.queue, self.spec.exchange
                    ))
                })?;
        }

        info!(
            queue = %self.spec.queue,
            exchange = %self.spec.exchange,
            bindings = ?self.spec.bindings,
            "consumer bound, processing messages"
        );

        let consumer_tag = format!("{}-consumer", self.spec.queue);
        let mut consumer = channel
            .basic_consume(
                &self.spec.queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Consume(format!("failed to start consumer: {e}")))?;

        while let Some(delivery) = consumer.next().await {
            match delivery {
                Ok(delivery) => self.dispatch(delivery).await,
                Err(e) => {
                    return Err(BrokerError::Consume(format!("delivery error: {e}")));
                }
            }
        }

        Ok(())
    }

    /// Decode, invoke, acknowledge. A failing handler nacks the message
    /// (requeue-or-drop is broker policy); an undecodable body is rejected
    /// without requeue since redelivery cannot fix it.
    async fn dispatch(&self, delivery: Delivery) {
        match serde_json::from_slice::<EventEnvelope>(&delivery.data) {
            Ok(envelope) => {
                debug!(
                    queue = %self.spec.queue,
                    routing_key = %delivery.routing_key,
                    event_type = %envelope.event_type,
                    "received event"
                );

                match self.handler.handle(&envelope).await {
                    Ok(()) => {
                        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                            error!(error = %e, "failed to ack message");
                        }
                    }
                    Err(e) => {
                        error!(
                            queue = %self.spec.queue,
                            event_type = %envelope.event_type,
                            error = %e,
                            "handler failed, nacking message"
                        );
                        let nack = BasicNackOptions {
                            requeue: false,
                            ..Default::default()
                        };
                        if let Err(e) = delivery.nack(nack).await {
                            error!(error = %e, "failed to nack message");
                        }
                    }
                }
            }
            Err(e) => {
                error!(queue = %self.spec.queue, error = %e, "undecodable message body, rejecting");
                let reject = BasicRejectOptions { requeue: false };
                if let Err(e) = delivery.reject(reject).await {
                    error!(error = %e, "failed to reject message");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_patterns_match_exactly() {
        assert!(routing_key_matches("task.created", "task.created"));
        assert!(!routing_key_matches("task.created", "task.cancelled"));
        assert!(!routing_key_matches("task.created", "task.created.extra"));
    }

    #[test]
    fn star_matches_exactly_one_segment() {
        assert!(routing_key_matches("team.*", "team.deactivated"));
        assert!(routing_key_matches("team.*", "team.user_assigned"));
        assert!(!routing_key_matches("team.*", "team"));
        assert!(!routing_key_matches("team.*", "team.member.added"));
        assert!(routing_key_matches("*.created", "task.created"));
    }

    #[test]
    fn hash_matches_zero_or_more_segments() {
        assert!(routing_key_matches("#", "task.created"));
        assert!(routing_key_matches("task.#", "task.created"));
        assert!(routing_key_matches("task.#", "task"));
        assert!(routing_key_matches("task.#", "task.status.changed"));
        assert!(!routing_key_matches("task.#", "team.deactivated"));
    }

    #[test]
    fn queue_spec_matches_any_binding() {
        let spec = QueueSpec::new(
            "task_team_events",
            "team_events",
            &["team.*", "org_unit.*"],
        );
        assert!(spec.matches("team.deactivated"));
        assert!(spec.matches("org_unit.deactivated"));
        assert!(!spec.matches("user.status_changed"));
    }
}
