//! # User Model
//!
//! Account records owned by the user service. `team_id` is a logical
//! reference into the team service; it is kept in sync by the
//! `team.user_assigned` consumer, not a foreign key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
    Pending,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
            UserStatus::Pending => "pending",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(UserStatus::Active),
            "inactive" => Some(UserStatus::Inactive),
            "suspended" => Some(UserStatus::Suspended),
            "pending" => Some(UserStatus::Pending),
            _ => None,
        }
    }

    /// Statuses that cancel the user's open tasks when announced.
    pub fn cancels_tasks(&self) -> bool {
        matches!(self, UserStatus::Suspended | UserStatus::Inactive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
    TeamAdmin,
    Manager,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::TeamAdmin => "team_admin",
            UserRole::Manager => "manager",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub role: String,
    pub status: String,
    pub team_id: Option<i64>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub hashed_password: String,
    pub role: UserRole,
}

impl User {
    pub fn status(&self) -> Option<UserStatus> {
        UserStatus::parse(&self.status)
    }

    pub async fn create(pool: &PgPool, new_user: NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, hashed_password, role, status, created_at)
            VALUES ($1, $2, $3, $4, 'active', NOW())
            RETURNING *
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.hashed_password)
        .bind(new_user.role.as_str())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_profile(
        pool: &PgPool,
        id: i64,
        name: Option<&str>,
        phone: Option<&str>,
        position: Option<&str>,
        department: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                position = COALESCE($4, position),
                department = COALESCE($5, department),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(phone)
        .bind(position)
        .bind(department)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: i64,
        status: UserStatus,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(pool)
        .await
    }

    /// Consumer entry point for `team.user_assigned`.
    pub async fn set_team(pool: &PgPool, user_id: i64, team_id: i64) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET team_id = $2, updated_at = NOW() WHERE id = $1")
                .bind(user_id)
                .bind(team_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Users are physically deleted, unlike the soft-deleted entities.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspended_and_inactive_cancel_tasks() {
        assert!(UserStatus::Suspended.cancels_tasks());
        assert!(UserStatus::Inactive.cancels_tasks());
        assert!(!UserStatus::Active.cancels_tasks());
        assert!(!UserStatus::Pending.cancels_tasks());
    }
}
