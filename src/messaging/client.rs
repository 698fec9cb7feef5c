//! AMQP broker client backed by a deadpool-lapin connection pool.
//!
//! One pool per process; every publish or consume setup acquires a channel
//! from a pooled connection and releases it when done. Reconnection is
//! detected at use time: a dead connection fails channel creation and the
//! pool replaces it on the next acquisition.

use deadpool_lapin::{Manager, Pool, PoolError};
use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, ConnectionProperties, ExchangeKind,
};
use tracing::{debug, info};

use super::errors::BrokerError;

const POOL_MAX_SIZE: usize = 8;

/// Pooled connection to the topic-exchange broker.
#[derive(Clone)]
pub struct BrokerClient {
    pool: Pool,
}

impl BrokerClient {
    /// Create the pool and verify one connection can be established.
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let manager = Manager::new(url.to_string(), ConnectionProperties::default());
        let pool = Pool::builder(manager)
            .max_size(POOL_MAX_SIZE)
            .build()
            .map_err(|e| BrokerError::Connection(format!("failed to build pool: {e}")))?;

        let conn = pool
            .get()
            .await
            .map_err(|e| BrokerError::Connection(format!("failed to connect: {e}")))?;
        drop(conn);

        info!(url = %url, "connected to broker");
        Ok(Self { pool })
    }

    /// Acquire a channel from a pooled connection.
    pub(crate) async fn channel(&self) -> Result<Channel, BrokerError> {
        let conn = self.pool.get().await.map_err(|e: PoolError| {
            BrokerError::Connection(format!("failed to get pooled connection: {e}"))
        })?;

        conn.create_channel()
            .await
            .map_err(|e| BrokerError::Connection(format!("failed to create channel: {e}")))
    }

    /// Declare a durable topic exchange. Idempotent on the broker side.
    pub(crate) async fn declare_topic_exchange(
        &self,
        channel: &Channel,
        exchange: &str,
    ) -> Result<(), BrokerError> {
        channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Setup(format!("failed to declare exchange {exchange}: {e}")))
    }

    /// Publish a persistent JSON message to a topic exchange.
    ///
    /// The channel is scoped to this call; it is dropped (released) once the
    /// broker confirms the publish.
    pub async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), BrokerError> {
        let channel = self.channel().await?;
        self.declare_topic_exchange(&channel, exchange).await?;

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(2); // persistent

        let confirm = channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await
            .map_err(|e| BrokerError::Publish(format!("basic_publish failed: {e}")))?;

        confirm
            .await
            .map_err(|e| BrokerError::Publish(format!("publish confirmation failed: {e}")))?;

        debug!(exchange = %exchange, routing_key = %routing_key, "published event");
        Ok(())
    }
}
