//! # Event Fabric
//!
//! Broker client, topic routing, and the consumer supervisor shared by all
//! four services. Publishing and consuming both go through a pooled AMQP
//! connection; channels are acquired per operation and released on completion.

pub mod client;
pub mod errors;
pub mod router;
pub mod supervisor;

pub use client::BrokerClient;
pub use errors::BrokerError;
pub use router::{routing_key_matches, EventHandler, EventRouter, QueueSpec};
pub use supervisor::{BackoffPolicy, ConsumerState, ConsumerSupervisor};
