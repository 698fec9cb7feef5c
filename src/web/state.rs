//! Shared per-service state handed to every handler.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServiceConfig;
use crate::events::EventPublisher;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub publisher: EventPublisher,
    pub config: Arc<ServiceConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(pool: PgPool, publisher: EventPublisher, config: ServiceConfig) -> Self {
        Self {
            pool,
            publisher,
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }
}
