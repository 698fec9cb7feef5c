//! Task evaluations. Criteria are stored as the JSON object submitted by the
//! evaluator; `score` is the mean of the criteria values, computed at insert
//! time by [`crate::performance::mean_score`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TaskEvaluation {
    pub id: i64,
    pub task_id: i64,
    pub evaluator_id: i64,
    pub criteria: serde_json::Value,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TaskEvaluation {
    pub async fn create(
        pool: &PgPool,
        task_id: i64,
        evaluator_id: i64,
        criteria: &serde_json::Value,
        score: f64,
        feedback: Option<&str>,
    ) -> Result<TaskEvaluation, sqlx::Error> {
        sqlx::query_as::<_, TaskEvaluation>(
            r#"
            INSERT INTO task_evaluations (task_id, evaluator_id, criteria, score, feedback, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(evaluator_id)
        .bind(criteria)
        .bind(score)
        .bind(feedback)
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_task(
        pool: &PgPool,
        task_id: i64,
    ) -> Result<Vec<TaskEvaluation>, sqlx::Error> {
        sqlx::query_as::<_, TaskEvaluation>(
            "SELECT * FROM task_evaluations WHERE task_id = $1 ORDER BY created_at",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// All evaluations of tasks assigned to a user whose task completed
    /// inside the period. Feeds the performance recompute.
    pub async fn list_for_assignee_in_period(
        pool: &PgPool,
        assignee_id: i64,
        period_start: chrono::NaiveDate,
        period_end: chrono::NaiveDate,
    ) -> Result<Vec<TaskEvaluation>, sqlx::Error> {
        sqlx::query_as::<_, TaskEvaluation>(
            r#"
            SELECT e.* FROM task_evaluations e
            JOIN tasks t ON t.id = e.task_id
            WHERE t.assignee_id = $1
              AND t.completed_at >= $2::date
              AND t.completed_at < ($3::date + INTERVAL '1 day')
            ORDER BY e.created_at
            "#,
        )
        .bind(assignee_id)
        .bind(period_start)
        .bind(period_end)
        .fetch_all(pool)
        .await
    }
}
