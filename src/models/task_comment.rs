//! Task comments. Flat list per task, physically deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TaskComment {
    pub id: i64,
    pub task_id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl TaskComment {
    pub async fn create(
        pool: &PgPool,
        task_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<TaskComment, sqlx::Error> {
        sqlx::query_as::<_, TaskComment>(
            r#"
            INSERT INTO task_comments (task_id, author_id, content, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(pool)
        .await
    }

    pub async fn list_by_task(pool: &PgPool, task_id: i64) -> Result<Vec<TaskComment>, sqlx::Error> {
        sqlx::query_as::<_, TaskComment>(
            "SELECT * FROM task_comments WHERE task_id = $1 ORDER BY created_at",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<TaskComment>, sqlx::Error> {
        sqlx::query_as::<_, TaskComment>("SELECT * FROM task_comments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
