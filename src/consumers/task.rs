//! Task-service consumers: react to user and team lifecycle events by
//! cancelling or relabelling the affected open tasks.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::events::{
    routing_keys, EventEnvelope, OrgUnitDeactivated, TeamDeactivated, TeamUserAssigned,
    UserStatusChanged,
};
use crate::messaging::EventHandler;
use crate::models::{Task, UserStatus};

/// Bound to `user_events` with `user.*`.
pub struct TaskUserEventsHandler {
    pool: PgPool,
}

impl TaskUserEventsHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventHandler for TaskUserEventsHandler {
    async fn handle(&self, event: &EventEnvelope) -> anyhow::Result<()> {
        if event.event_type != routing_keys::USER_STATUS_CHANGED {
            return Ok(());
        }

        let payload: UserStatusChanged = event.payload()?;
        let cancels = UserStatus::parse(&payload.new_status)
            .map(|s| s.cancels_tasks())
            .unwrap_or_else(|| {
                warn!(status = %payload.new_status, "unknown user status in event");
                false
            });
        if !cancels {
            return Ok(());
        }

        let cancelled = Task::cancel_open_for_assignee(&self.pool, payload.user_id).await?;
        info!(
            user_id = payload.user_id,
            new_status = %payload.new_status,
            cancelled,
            "cancelled open tasks for deactivated user"
        );
        Ok(())
    }
}

/// Bound to `team_events` with `team.*` and `org_unit.*`.
pub struct TaskTeamEventsHandler {
    pool: PgPool,
}

impl TaskTeamEventsHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventHandler for TaskTeamEventsHandler {
    async fn handle(&self, event: &EventEnvelope) -> anyhow::Result<()> {
        match event.event_type.as_str() {
            routing_keys::TEAM_USER_ASSIGNED => {
                let payload: TeamUserAssigned = event.payload()?;
                let updated = Task::backfill_team_for_assignee(
                    &self.pool,
                    payload.user_id,
                    payload.team_id,
                )
                .await?;
                info!(
                    user_id = payload.user_id,
                    team_id = payload.team_id,
                    updated,
                    "backfilled team on user's tasks"
                );
            }
            routing_keys::TEAM_DEACTIVATED => {
                let payload: TeamDeactivated = event.payload()?;
                let cancelled = Task::cancel_open_for_team(&self.pool, payload.team_id).await?;
                info!(
                    team_id = payload.team_id,
                    cancelled,
                    "cancelled open tasks for deactivated team"
                );
            }
            routing_keys::ORG_UNIT_DEACTIVATED => {
                let payload: OrgUnitDeactivated = event.payload()?;
                let cancelled =
                    Task::cancel_open_for_org_unit(&self.pool, payload.org_unit_id).await?;
                info!(
                    org_unit_id = payload.org_unit_id,
                    cancelled,
                    "cancelled open tasks for deactivated org unit"
                );
            }
            _ => {}
        }
        Ok(())
    }
}
