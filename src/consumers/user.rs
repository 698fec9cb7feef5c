//! User-service consumer: records team assignments announced by the team
//! service on the user rows it owns.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::events::{routing_keys, EventEnvelope, TeamUserAssigned};
use crate::messaging::EventHandler;
use crate::models::User;

/// Bound to `team_events` with `team.*`.
pub struct UserTeamEventsHandler {
    pool: PgPool,
}

impl UserTeamEventsHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventHandler for UserTeamEventsHandler {
    async fn handle(&self, event: &EventEnvelope) -> anyhow::Result<()> {
        if event.event_type != routing_keys::TEAM_USER_ASSIGNED {
            return Ok(());
        }

        let payload: TeamUserAssigned = event.payload()?;
        let updated = User::set_team(&self.pool, payload.user_id, payload.team_id).await?;
        if updated == 0 {
            warn!(
                user_id = payload.user_id,
                "team assignment for unknown user, ignoring"
            );
        } else {
            info!(
                user_id = payload.user_id,
                team_id = payload.team_id,
                "recorded team assignment"
            );
        }
        Ok(())
    }
}
