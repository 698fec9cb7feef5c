//! # Org Unit Model
//!
//! Organizational tree keyed by `parent_id`. A unit's level is derived from
//! its parent at insert time (`parent.level + 1`, roots at level 1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrgUnit {
    pub id: i64,
    pub team_id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub level: i32,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl OrgUnit {
    pub async fn create(
        pool: &PgPool,
        team_id: i64,
        name: &str,
        parent_id: Option<i64>,
        description: Option<&str>,
    ) -> Result<OrgUnit, sqlx::Error> {
        let level = match parent_id {
            Some(parent_id) => {
                let parent = Self::find_by_id(pool, parent_id)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                parent.level + 1
            }
            None => 1,
        };

        sqlx::query_as::<_, OrgUnit>(
            r#"
            INSERT INTO org_units (team_id, name, parent_id, level, description, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, NOW())
            RETURNING *
            "#,
        )
        .bind(team_id)
        .bind(name)
        .bind(parent_id)
        .bind(level)
        .bind(description)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<OrgUnit>, sqlx::Error> {
        sqlx::query_as::<_, OrgUnit>("SELECT * FROM org_units WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_team(pool: &PgPool, team_id: i64) -> Result<Vec<OrgUnit>, sqlx::Error> {
        sqlx::query_as::<_, OrgUnit>(
            "SELECT * FROM org_units WHERE team_id = $1 AND is_active = TRUE ORDER BY level, id",
        )
        .bind(team_id)
        .fetch_all(pool)
        .await
    }

    pub async fn deactivate(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE org_units SET is_active = FALSE WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
