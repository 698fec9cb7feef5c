//! # Org Member Model
//!
//! Membership of users in org units. `manager_id` forms the reporting tree,
//! which is independent of the org-unit tree: who you report to is not
//! determined by which unit you sit in.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrgMember {
    pub id: i64,
    pub user_id: i64,
    pub org_unit_id: i64,
    pub position: Option<String>,
    pub manager_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Node in the subordinates tree returned by the hierarchy endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubordinateNode {
    pub user_id: i64,
    pub position: Option<String>,
    pub org_unit_id: i64,
    pub subordinates: Vec<SubordinateNode>,
}

impl OrgMember {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        org_unit_id: i64,
        position: Option<&str>,
        manager_id: Option<i64>,
    ) -> Result<OrgMember, sqlx::Error> {
        sqlx::query_as::<_, OrgMember>(
            r#"
            INSERT INTO org_members (user_id, org_unit_id, position, manager_id, is_active, created_at)
            VALUES ($1, $2, $3, $4, TRUE, NOW())
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(org_unit_id)
        .bind(position)
        .bind(manager_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_active_by_user(
        pool: &PgPool,
        user_id: i64,
    ) -> Result<Option<OrgMember>, sqlx::Error> {
        sqlx::query_as::<_, OrgMember>(
            "SELECT * FROM org_members WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn exists_active(
        pool: &PgPool,
        user_id: i64,
        org_unit_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM org_members WHERE user_id = $1 AND org_unit_id = $2 AND is_active = TRUE",
        )
        .bind(user_id)
        .bind(org_unit_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.is_some())
    }

    /// Consumer entry point for `user.status_changed`: membership follows
    /// the account's active flag across all units.
    pub async fn set_active_for_user(
        pool: &PgPool,
        user_id: i64,
        is_active: bool,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE org_members SET is_active = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(is_active)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Walk the reporting chain upward from a user's direct manager.
    /// Iterative, with a visited guard against accidental cycles.
    pub async fn managers_chain(
        pool: &PgPool,
        user_id: i64,
    ) -> Result<Vec<OrgMember>, sqlx::Error> {
        let mut chain = Vec::new();
        let mut visited = std::collections::HashSet::new();

        let start = Self::find_active_by_user(pool, user_id).await?;
        let mut next_manager = start.and_then(|m| m.manager_id);

        while let Some(manager_id) = next_manager {
            if !visited.insert(manager_id) {
                break;
            }
            match Self::find_active_by_user(pool, manager_id).await? {
                Some(manager) => {
                    next_manager = manager.manager_id;
                    chain.push(manager);
                }
                None => break,
            }
        }

        Ok(chain)
    }

    /// Build the subordinates tree below a user.
    pub fn subordinates_tree<'a>(
        pool: &'a PgPool,
        user_id: i64,
    ) -> BoxFuture<'a, Result<Vec<SubordinateNode>, sqlx::Error>> {
        Box::pin(async move {
            let direct = sqlx::query_as::<_, OrgMember>(
                "SELECT * FROM org_members WHERE manager_id = $1 AND is_active = TRUE ORDER BY id",
            )
            .bind(user_id)
            .fetch_all(pool)
            .await?;

            let mut nodes = Vec::with_capacity(direct.len());
            for member in direct {
                let subordinates = Self::subordinates_tree(pool, member.user_id).await?;
                nodes.push(SubordinateNode {
                    user_id: member.user_id,
                    position: member.position,
                    org_unit_id: member.org_unit_id,
                    subordinates,
                });
            }
            Ok(nodes)
        })
    }
}
