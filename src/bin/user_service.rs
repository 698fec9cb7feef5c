//! User service: accounts, auth, and the `user_events` producer. Consumes
//! `team_events` to keep `users.team_id` in sync.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use teamflow::config::ServiceConfig;
use teamflow::consumers::{user_team_events_queue, UserTeamEventsHandler};
use teamflow::events::EventPublisher;
use teamflow::logging::init_logging;
use teamflow::messaging::{BackoffPolicy, BrokerClient, ConsumerSupervisor, EventRouter};
use teamflow::web::{state::AppState, user_router};

#[tokio::main]
async fn main() -> teamflow::error::Result<()> {
    init_logging();
    let config = ServiceConfig::load("user", 8001)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    let broker = BrokerClient::connect(&config.broker_url).await?;
    let publisher = EventPublisher::new(broker.clone());

    let handler = Arc::new(UserTeamEventsHandler::new(pool.clone()));
    let router = EventRouter::new(broker.clone(), user_team_events_queue(), handler);
    ConsumerSupervisor::new(router)
        .with_backoff(BackoffPolicy::Fixed(std::time::Duration::from_secs(
            config.consumer_backoff_seconds,
        )))
        .spawn();

    let bind_address = config.bind_address.clone();
    let app = user_router(AppState::new(pool, publisher, config));
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "user service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
    }
    info!("shutdown signal received");
}
