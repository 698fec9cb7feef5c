//! # Teamflow
//!
//! Four cooperating services — user, team, task, calendar — that own their
//! data separately and converge through domain events on a RabbitMQ
//! topic-exchange fabric.
//!
//! The crate is a single library with one binary per service. Shared layers:
//!
//! - [`messaging`] — pooled broker client, topic router, consumer supervisor
//! - [`events`] — envelope format, typed payloads, fire-and-forget publisher
//! - [`consumers`] — per-service reactions to foreign events
//! - [`models`] — one module per table, runtime-checked sqlx queries
//! - [`scheduling`] — half-open conflict detection and meeting validation
//! - [`performance`] — evaluation scoring and two-level aggregation
//! - [`web`] — axum routers, bearer auth, the common error surface
//!
//! Delivery contract: producers publish after commit and never retry
//! (at-most-once), consumers ack after their idempotent side effect
//! (at-least-once per delivered message). Cross-service rows therefore
//! converge, they are never transactionally consistent.

pub mod config;
pub mod consumers;
pub mod error;
pub mod events;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod performance;
pub mod scheduling;
pub mod web;

pub use error::{Result, TeamflowError};
