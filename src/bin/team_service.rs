//! Team service: teams, org units, and the reporting hierarchy. Produces
//! `team_events`; consumes `user_events` to deactivate memberships.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use teamflow::config::ServiceConfig;
use teamflow::consumers::{team_user_events_queue, TeamUserEventsHandler};
use teamflow::events::EventPublisher;
use teamflow::logging::init_logging;
use teamflow::messaging::{BackoffPolicy, BrokerClient, ConsumerSupervisor, EventRouter};
use teamflow::web::{state::AppState, team_router};

#[tokio::main]
async fn main() -> teamflow::error::Result<()> {
    init_logging();
    let config = ServiceConfig::load("team", 8002)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    let broker = BrokerClient::connect(&config.broker_url).await?;
    let publisher = EventPublisher::new(broker.clone());

    let handler = Arc::new(TeamUserEventsHandler::new(pool.clone()));
    let router = EventRouter::new(broker.clone(), team_user_events_queue(), handler);
    ConsumerSupervisor::new(router)
        .with_backoff(BackoffPolicy::Fixed(std::time::Duration::from_secs(
            config.consumer_backoff_seconds,
        )))
        .spawn();

    let bind_address = config.bind_address.clone();
    let app = team_router(AppState::new(pool, publisher, config));
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "team service listening");

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
