//! Calendar-service consumer: mirrors assigned tasks with due dates into
//! the assignee's calendar.

use async_trait::async_trait;
use chrono::Duration;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::events::{routing_keys, EventEnvelope, TaskCreated};
use crate::messaging::EventHandler;
use crate::models::{CalendarEvent, EventKind, NewCalendarEvent};

/// Length of the mirror block placed before a task's due time.
const TASK_BLOCK_HOURS: i64 = 1;

/// Bound to `task_events` with `task.*`.
pub struct CalendarTaskEventsHandler {
    pool: PgPool,
}

impl CalendarTaskEventsHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventHandler for CalendarTaskEventsHandler {
    async fn handle(&self, event: &EventEnvelope) -> anyhow::Result<()> {
        if event.event_type != routing_keys::TASK_CREATED {
            return Ok(());
        }

        let payload: TaskCreated = event.payload()?;
        let (Some(assignee_id), Some(due_at)) = (payload.assignee_id, payload.due_at) else {
            debug!(task_id = payload.task_id, "task has no assignee or due date, skipping");
            return Ok(());
        };

        // Redelivery guard: one mirror event per task.
        if CalendarEvent::find_by_task_id(&self.pool, payload.task_id)
            .await?
            .is_some()
        {
            debug!(task_id = payload.task_id, "mirror event already exists, skipping");
            return Ok(());
        }

        let event = CalendarEvent::create(
            &self.pool,
            NewCalendarEvent {
                title: format!("Task: {}", payload.title),
                description: None,
                owner_id: assignee_id,
                event_type: EventKind::Task,
                start_at: due_at - Duration::hours(TASK_BLOCK_HOURS),
                end_at: due_at,
                participants: None,
                task_id: Some(payload.task_id),
                location: None,
            },
        )
        .await?;

        info!(
            task_id = payload.task_id,
            event_id = event.id,
            owner_id = assignee_id,
            "created calendar mirror for task"
        );
        Ok(())
    }
}
