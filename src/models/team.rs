//! # Team Model
//!
//! Teams are soft-deleted: deactivation flips `is_active` and fires
//! `team.deactivated` so the task service can cancel the team's open work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub owner_id: Option<i64>,
    pub invite_code: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub async fn create(
        pool: &PgPool,
        name: &str,
        owner_id: Option<i64>,
        invite_code: &str,
    ) -> Result<Team, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name, owner_id, invite_code, is_active, created_at)
            VALUES ($1, $2, $3, TRUE, NOW())
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(owner_id)
        .bind(invite_code)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_invite_code(
        pool: &PgPool,
        invite_code: &str,
    ) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            "SELECT * FROM teams WHERE invite_code = $1 AND is_active = TRUE",
        )
        .bind(invite_code)
        .fetch_optional(pool)
        .await
    }

    /// Soft delete. The `is_active` guard makes a repeat call affect no rows.
    pub async fn deactivate(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE teams SET is_active = FALSE WHERE id = $1 AND is_active = TRUE")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
