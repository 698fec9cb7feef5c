//! # Event Consumers
//!
//! One handler per (service, queue) pair. Each queue binds a service's queue
//! to a foreign exchange with topic patterns; handlers dispatch on
//! `event_type` and ignore anything they do not recognize, so widening a
//! binding never breaks an existing consumer.
//!
//! Every side effect is idempotent at the SQL layer (status and flag guards
//! in the model functions), so redelivery after a nack or a reconnect is
//! safe.

pub mod calendar;
pub mod task;
pub mod team;
pub mod user;

pub use calendar::CalendarTaskEventsHandler;
pub use task::{TaskTeamEventsHandler, TaskUserEventsHandler};
pub use team::TeamUserEventsHandler;
pub use user::UserTeamEventsHandler;

use crate::events::exchanges;
use crate::messaging::QueueSpec;

pub fn task_user_events_queue() -> QueueSpec {
    QueueSpec::new("task_service.user_events", exchanges::USER_EVENTS, &["user.*"])
}

pub fn task_team_events_queue() -> QueueSpec {
    QueueSpec::new(
        "task_service.team_events",
        exchanges::TEAM_EVENTS,
        &["team.*", "org_unit.*"],
    )
}

pub fn calendar_task_events_queue() -> QueueSpec {
    QueueSpec::new("calendar_service.task_events", exchanges::TASK_EVENTS, &["task.*"])
}

pub fn team_user_events_queue() -> QueueSpec {
    QueueSpec::new("team_service.user_events", exchanges::USER_EVENTS, &["user.*"])
}

pub fn user_team_events_queue() -> QueueSpec {
    QueueSpec::new("user_service.team_events", exchanges::TEAM_EVENTS, &["team.*"])
}
