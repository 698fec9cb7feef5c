//! # Task Model
//!
//! Task records and the status machine
//! `created → in_progress → review → completed/cancelled`.
//!
//! Cancellation driven by foreign events (user suspension, team or org-unit
//! deactivation) goes through the `cancel_open_*` functions. Each carries a
//! `WHERE status = ANY(open)` guard, so redelivering the same event is a
//! no-op: the rows are already terminal and match nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    InProgress,
    Review,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Non-terminal states, eligible for event-driven cancellation.
    pub const OPEN: [TaskStatus; 3] = [TaskStatus::Created, TaskStatus::InProgress, TaskStatus::Review];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "created",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(TaskStatus::Created),
            "in_progress" => Some(TaskStatus::InProgress),
            "review" => Some(TaskStatus::Review),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Legal forward transitions. Cancellation is reachable from any
    /// non-terminal state; terminal states never move.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match (self, next) {
            (TaskStatus::Created, TaskStatus::InProgress) => true,
            (TaskStatus::InProgress, TaskStatus::Review) => true,
            (TaskStatus::Review, TaskStatus::Completed) => true,
            (_, TaskStatus::Cancelled) => !self.is_terminal(),
            _ => false,
        }
    }

    fn open_status_strings() -> Vec<String> {
        Self::OPEN.iter().map(|s| s.as_str().to_string()).collect()
    }
}

/// Task priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            "urgent" => Some(TaskPriority::Urgent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: i64,
    pub assignee_id: Option<i64>,
    pub team_id: Option<i64>,
    pub org_unit_id: Option<i64>,
    pub status: String,
    pub priority: String,
    pub due_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload (generated fields omitted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub creator_id: i64,
    pub assignee_id: Option<i64>,
    pub team_id: Option<i64>,
    pub org_unit_id: Option<i64>,
    pub priority: Option<TaskPriority>,
    pub due_at: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
}

impl Task {
    pub fn status(&self) -> Option<TaskStatus> {
        TaskStatus::parse(&self.status)
    }

    pub async fn create(pool: &PgPool, new_task: NewTask) -> Result<Task, sqlx::Error> {
        let priority = new_task.priority.unwrap_or(TaskPriority::Medium);
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (
                title, description, creator_id, assignee_id, team_id, org_unit_id,
                status, priority, due_at, estimated_hours, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'created', $7, $8, $9, NOW())
            RETURNING *
            "#,
        )
        .bind(&new_task.title)
        .bind(&new_task.description)
        .bind(new_task.creator_id)
        .bind(new_task.assignee_id)
        .bind(new_task.team_id)
        .bind(new_task.org_unit_id)
        .bind(priority.as_str())
        .bind(new_task.due_at)
        .bind(new_task.estimated_hours)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_assignee(pool: &PgPool, assignee_id: i64) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE assignee_id = $1 ORDER BY created_at DESC",
        )
        .bind(assignee_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_team(pool: &PgPool, team_id: i64) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE team_id = $1 ORDER BY created_at DESC",
        )
        .bind(team_id)
        .fetch_all(pool)
        .await
    }

    /// Apply a status transition, auto-setting `started_at` on the first move
    /// to in_progress and `completed_at` on completion. Transition legality
    /// is checked by the caller against [`TaskStatus::can_transition_to`].
    pub async fn update_status(
        pool: &PgPool,
        id: i64,
        new_status: TaskStatus,
        actual_hours: Option<f64>,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $2,
                started_at = CASE
                    WHEN $2 = 'in_progress' AND started_at IS NULL THEN NOW()
                    ELSE started_at
                END,
                completed_at = CASE
                    WHEN $2 = 'completed' AND completed_at IS NULL THEN NOW()
                    ELSE completed_at
                END,
                actual_hours = COALESCE($3, actual_hours),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(new_status.as_str())
        .bind(actual_hours)
        .fetch_optional(pool)
        .await
    }

    /// Cancel all open tasks assigned to a user. Idempotent: already-terminal
    /// rows do not match the status guard.
    pub async fn cancel_open_for_assignee(
        pool: &PgPool,
        assignee_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'cancelled', updated_at = NOW()
            WHERE assignee_id = $1 AND status = ANY($2)
            "#,
        )
        .bind(assignee_id)
        .bind(TaskStatus::open_status_strings())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Cancel all open tasks under a team.
    pub async fn cancel_open_for_team(pool: &PgPool, team_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'cancelled', updated_at = NOW()
            WHERE team_id = $1 AND status = ANY($2)
            "#,
        )
        .bind(team_id)
        .bind(TaskStatus::open_status_strings())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Cancel all open tasks under an org unit.
    pub async fn cancel_open_for_org_unit(
        pool: &PgPool,
        org_unit_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'cancelled', updated_at = NOW()
            WHERE org_unit_id = $1 AND status = ANY($2)
            "#,
        )
        .bind(org_unit_id)
        .bind(TaskStatus::open_status_strings())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Backfill `team_id` on a user's team-less tasks after team assignment.
    /// Idempotent: rows that already carry a team do not match.
    pub async fn backfill_team_for_assignee(
        pool: &PgPool,
        assignee_id: i64,
        team_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET team_id = $2, updated_at = NOW()
            WHERE assignee_id = $1 AND team_id IS NULL
            "#,
        )
        .bind(assignee_id)
        .bind(team_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_machine_allows_forward_path() {
        assert!(TaskStatus::Created.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Review));
        assert!(TaskStatus::Review.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn status_machine_rejects_skips_and_backward_moves() {
        assert!(!TaskStatus::Created.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Created.can_transition_to(TaskStatus::Review));
        assert!(!TaskStatus::Review.can_transition_to(TaskStatus::InProgress));
        assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn cancellation_reachable_from_any_open_state_only() {
        for status in TaskStatus::OPEN {
            assert!(status.can_transition_to(TaskStatus::Cancelled));
        }
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Cancelled));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Cancelled));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            TaskStatus::Created,
            TaskStatus::InProgress,
            TaskStatus::Review,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("archived"), None);
    }
}
