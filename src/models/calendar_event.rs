//! # Calendar Event Model
//!
//! Events live on the half-open interval `[start_at, end_at)`. Two events
//! conflict when `start_a < end_b AND start_b < end_a`; back-to-back events
//! that touch at a boundary do not. Cancelled events never conflict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::InProgress => "in_progress",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(EventStatus::Scheduled),
            "in_progress" => Some(EventStatus::InProgress),
            "completed" => Some(EventStatus::Completed),
            "cancelled" => Some(EventStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Meeting,
    Task,
    Reminder,
    Personal,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Meeting => "meeting",
            EventKind::Task => "task",
            EventKind::Reminder => "reminder",
            EventKind::Personal => "personal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CalendarEvent {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub event_type: String,
    pub status: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// JSON array of participant user ids, NULL for solo events.
    pub participants: Option<serde_json::Value>,
    /// Set on mirror events created from `task.created`.
    pub task_id: Option<i64>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub event_type: EventKind,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub participants: Option<Vec<i64>>,
    pub task_id: Option<i64>,
    pub location: Option<String>,
}

impl CalendarEvent {
    pub fn status(&self) -> Option<EventStatus> {
        EventStatus::parse(&self.status)
    }

    pub fn participant_ids(&self) -> Vec<i64> {
        self.participants
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_i64()).collect())
            .unwrap_or_default()
    }

    pub async fn create(pool: &PgPool, event: NewCalendarEvent) -> Result<CalendarEvent, sqlx::Error> {
        let participants = event
            .participants
            .as_ref()
            .map(|ids| serde_json::json!(ids));
        sqlx::query_as::<_, CalendarEvent>(
            r#"
            INSERT INTO calendar_events (
                title, description, owner_id, event_type, status,
                start_at, end_at, participants, task_id, location, created_at
            )
            VALUES ($1, $2, $3, $4, 'scheduled', $5, $6, $7, $8, $9, NOW())
            RETURNING *
            "#,
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.owner_id)
        .bind(event.event_type.as_str())
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(participants)
        .bind(event.task_id)
        .bind(&event.location)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<CalendarEvent>, sqlx::Error> {
        sqlx::query_as::<_, CalendarEvent>("SELECT * FROM calendar_events WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Idempotency probe for the `task.created` consumer.
    pub async fn find_by_task_id(
        pool: &PgPool,
        task_id: i64,
    ) -> Result<Option<CalendarEvent>, sqlx::Error> {
        sqlx::query_as::<_, CalendarEvent>(
            "SELECT * FROM calendar_events WHERE task_id = $1 LIMIT 1",
        )
        .bind(task_id)
        .fetch_optional(pool)
        .await
    }

    /// Events a user owns or participates in, inside a window.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, sqlx::Error> {
        sqlx::query_as::<_, CalendarEvent>(
            r#"
            SELECT * FROM calendar_events
            WHERE (owner_id = $1 OR participants @> to_jsonb(ARRAY[$1]))
              AND start_at < $3 AND end_at > $2
            ORDER BY start_at
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    /// Non-cancelled events of a user that overlap `[start, end)`, with an
    /// optional event to exclude (for reschedules).
    pub async fn overlapping(
        pool: &PgPool,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_event_id: Option<i64>,
    ) -> Result<Vec<CalendarEvent>, sqlx::Error> {
        sqlx::query_as::<_, CalendarEvent>(
            r#"
            SELECT * FROM calendar_events
            WHERE (owner_id = $1 OR participants @> to_jsonb(ARRAY[$1]))
              AND status != 'cancelled'
              AND start_at < $3 AND end_at > $2
              AND ($4::bigint IS NULL OR id != $4)
            ORDER BY start_at
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(exclude_event_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_times(
        pool: &PgPool,
        id: i64,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<Option<CalendarEvent>, sqlx::Error> {
        sqlx::query_as::<_, CalendarEvent>(
            r#"
            UPDATE calendar_events
            SET start_at = $2, end_at = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(start_at)
        .bind(end_at)
        .fetch_optional(pool)
        .await
    }

    /// Cancel an event. The status guard makes repeat cancellation a no-op.
    pub async fn cancel(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE calendar_events
            SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1 AND status != 'cancelled'
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
