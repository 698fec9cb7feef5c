//! User-service routes: registration, login, profile, and status
//! administration. Status changes are announced on `user_events` after the
//! row is committed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::events::{exchanges, routing_keys, UserStatusChanged};
use crate::models::{NewUser, User, UserRole, UserStatus};
use crate::web::auth::{create_access_token, hash_password, verify_password, AuthUser};
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if req.password.len() < 8 {
        return Err(ApiError::Unprocessable(
            "password must be at least 8 characters".to_string(),
        ));
    }
    if User::find_by_email(&state.pool, &req.email).await?.is_some() {
        return Err(ApiError::Conflict("email already registered".to_string(), None));
    }

    let user = User::create(
        &state.pool,
        NewUser {
            email: req.email,
            name: req.name,
            hashed_password: hash_password(&req.password)?,
            role: UserRole::User,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = User::find_by_email(&state.pool, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    if !verify_password(&req.password, &user.hashed_password) {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }
    if user.status() == Some(UserStatus::Suspended) {
        return Err(ApiError::Forbidden("account suspended".to_string()));
    }

    let token = create_access_token(
        user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_minutes,
    )?;
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer",
    }))
}

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let user = User::update_profile(
        &state.pool,
        auth.user_id,
        req.name.as_deref(),
        req.phone.as_deref(),
        req.position.as_deref(),
        req.department.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(user))
}

/// Set an account's status and announce it. The event fires after the commit;
/// a failed publish leaves the row changed and the announcement lost.
pub async fn set_status(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<Json<User>> {
    let status = UserStatus::parse(&req.status)
        .ok_or_else(|| ApiError::Unprocessable(format!("unknown status: {}", req.status)))?;

    let user = User::set_status(&state.pool, id, status)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    state
        .publisher
        .publish(
            exchanges::USER_EVENTS,
            routing_keys::USER_STATUS_CHANGED,
            &UserStatusChanged {
                user_id: user.id,
                new_status: status.as_str().to_string(),
            },
        )
        .await;

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if auth.user_id != id {
        return Err(ApiError::Forbidden("can only delete own account".to_string()));
    }
    let deleted = User::delete(&state.pool, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("user not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
