//! Team-service consumer: keeps org memberships in step with the account's
//! status announced by the user service.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::events::{routing_keys, EventEnvelope, UserStatusChanged};
use crate::messaging::EventHandler;
use crate::models::OrgMember;

/// Bound to `user_events` with `user.*`.
pub struct TeamUserEventsHandler {
    pool: PgPool,
}

impl TeamUserEventsHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventHandler for TeamUserEventsHandler {
    async fn handle(&self, event: &EventEnvelope) -> anyhow::Result<()> {
        if event.event_type != routing_keys::USER_STATUS_CHANGED {
            return Ok(());
        }

        let payload: UserStatusChanged = event.payload()?;
        let is_active = payload.new_status == "active";
        let updated =
            OrgMember::set_active_for_user(&self.pool, payload.user_id, is_active).await?;
        info!(
            user_id = payload.user_id,
            new_status = %payload.new_status,
            updated,
            "synced org memberships with user status"
        );
        Ok(())
    }
}
