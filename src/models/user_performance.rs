//! Per-user performance rows, one per (user, period). Upserts use a
//! check-then-act read followed by insert or update, so two concurrent
//! recomputes for a new (user, period) pair can both insert. The later
//! write wins on subsequent recomputes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserPerformance {
    pub id: i64,
    pub user_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_tasks: i32,
    pub completed_tasks: i32,
    pub average_score: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl UserPerformance {
    pub async fn find_for_period(
        pool: &PgPool,
        user_id: i64,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Result<Option<UserPerformance>, sqlx::Error> {
        sqlx::query_as::<_, UserPerformance>(
            r#"
            SELECT * FROM user_performance
            WHERE user_id = $1 AND period_start = $2 AND period_end = $3
            "#,
        )
        .bind(user_id)
        .bind(period_start)
        .bind(period_end)
        .fetch_optional(pool)
        .await
    }

    pub async fn upsert(
        pool: &PgPool,
        user_id: i64,
        period_start: NaiveDate,
        period_end: NaiveDate,
        total_tasks: i32,
        completed_tasks: i32,
        average_score: Option<f64>,
    ) -> Result<UserPerformance, sqlx::Error> {
        let existing = Self::find_for_period(pool, user_id, period_start, period_end).await?;
        match existing {
            Some(row) => {
                sqlx::query_as::<_, UserPerformance>(
                    r#"
                    UPDATE user_performance
                    SET total_tasks = $2, completed_tasks = $3,
                        average_score = $4, updated_at = NOW()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(row.id)
                .bind(total_tasks)
                .bind(completed_tasks)
                .bind(average_score)
                .fetch_one(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, UserPerformance>(
                    r#"
                    INSERT INTO user_performance (
                        user_id, period_start, period_end,
                        total_tasks, completed_tasks, average_score, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, NOW())
                    RETURNING *
                    "#,
                )
                .bind(user_id)
                .bind(period_start)
                .bind(period_end)
                .bind(total_tasks)
                .bind(completed_tasks)
                .bind(average_score)
                .fetch_one(pool)
                .await
            }
        }
    }
}
