//! Per-user availability: working hours as `HH:MM` strings plus a status
//! flag. Rows are created lazily with defaults the first time a user is
//! looked at by the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

pub const DEFAULT_WORK_START: &str = "09:00";
pub const DEFAULT_WORK_END: &str = "18:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    Busy,
    Away,
    DoNotDisturb,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "available",
            AvailabilityStatus::Busy => "busy",
            AvailabilityStatus::Away => "away",
            AvailabilityStatus::DoNotDisturb => "do_not_disturb",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(AvailabilityStatus::Available),
            "busy" => Some(AvailabilityStatus::Busy),
            "away" => Some(AvailabilityStatus::Away),
            "do_not_disturb" => Some(AvailabilityStatus::DoNotDisturb),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserAvailability {
    pub id: i64,
    pub user_id: i64,
    pub status: String,
    /// `HH:MM`, compared lexically against event times of day.
    pub work_start: String,
    pub work_end: String,
    pub updated_at: DateTime<Utc>,
}

impl UserAvailability {
    pub fn status(&self) -> Option<AvailabilityStatus> {
        AvailabilityStatus::parse(&self.status)
    }

    /// Fetch a user's availability, inserting the default row if absent.
    /// `ON CONFLICT DO NOTHING` keeps concurrent first-touches from racing.
    pub async fn ensure_default(
        pool: &PgPool,
        user_id: i64,
    ) -> Result<UserAvailability, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_availability (user_id, status, work_start, work_end, updated_at)
            VALUES ($1, 'available', $2, $3, NOW())
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(DEFAULT_WORK_START)
        .bind(DEFAULT_WORK_END)
        .execute(pool)
        .await?;

        sqlx::query_as::<_, UserAvailability>(
            "SELECT * FROM user_availability WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_user(
        pool: &PgPool,
        user_id: i64,
    ) -> Result<Option<UserAvailability>, sqlx::Error> {
        sqlx::query_as::<_, UserAvailability>(
            "SELECT * FROM user_availability WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        user_id: i64,
        status: Option<AvailabilityStatus>,
        work_start: Option<&str>,
        work_end: Option<&str>,
    ) -> Result<UserAvailability, sqlx::Error> {
        // Make sure the row exists before patching it.
        Self::ensure_default(pool, user_id).await?;
        sqlx::query_as::<_, UserAvailability>(
            r#"
            UPDATE user_availability
            SET status = COALESCE($2, status),
                work_start = COALESCE($3, work_start),
                work_end = COALESCE($4, work_end),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .bind(work_start)
        .bind(work_end)
        .fetch_one(pool)
        .await
    }
}
