//! Task service: task lifecycle, evaluations, and performance reports.
//! Produces `task_events`; consumes both `user_events` and `team_events` to
//! cancel or relabel open tasks.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use teamflow::config::ServiceConfig;
use teamflow::consumers::{
    task_team_events_queue, task_user_events_queue, TaskTeamEventsHandler, TaskUserEventsHandler,
};
use teamflow::events::EventPublisher;
use teamflow::logging::init_logging;
use teamflow::messaging::{BackoffPolicy, BrokerClient, ConsumerSupervisor, EventRouter};
use teamflow::web::{state::AppState, task_router};

#[tokio::main]
async fn main() -> teamflow::error::Result<()> {
    init_logging();
    let config = ServiceConfig::load("task", 8003)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    let broker = BrokerClient::connect(&config.broker_url).await?;
    let publisher = EventPublisher::new(broker.clone());
    let backoff = BackoffPolicy::Fixed(std::time::Duration::from_secs(
        config.consumer_backoff_seconds,
    ));

    let user_handler = Arc::new(TaskUserEventsHandler::new(pool.clone()));
    ConsumerSupervisor::new(EventRouter::new(
        broker.clone(),
        task_user_events_queue(),
        user_handler,
    ))
    .with_backoff(backoff)
    .spawn();

    let team_handler = Arc::new(TaskTeamEventsHandler::new(pool.clone()));
    ConsumerSupervisor::new(EventRouter::new(
        broker.clone(),
        task_team_events_queue(),
        team_handler,
    ))
    .with_backoff(backoff)
    .spawn();

    let bind_address = config.bind_address.clone();
    let app = task_router(AppState::new(pool, publisher, config));
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "task service listening");

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
