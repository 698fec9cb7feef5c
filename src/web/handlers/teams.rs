//! Team-service routes: teams, invite-code joins, the org-unit tree, and the
//! reporting hierarchy. Deactivations and joins are announced on
//! `team_events`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::events::{exchanges, routing_keys, OrgUnitDeactivated, TeamDeactivated, TeamUserAssigned};
use crate::models::{OrgMember, OrgUnit, SubordinateNode, Team};
use crate::web::auth::AuthUser;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinTeamRequest {
    pub invite_code: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrgUnitRequest {
    pub team_id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateInviteQuery {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: i64,
    pub position: Option<String>,
    pub manager_id: Option<i64>,
}

pub async fn create_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Unprocessable("team name must not be empty".to_string()));
    }
    let invite_code = Uuid::new_v4().simple().to_string();
    let team = Team::create(&state.pool, req.name.trim(), Some(auth.user_id), &invite_code).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Team>> {
    let team = Team::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("team not found".to_string()))?;
    Ok(Json(team))
}

/// Join by invite code. The membership fact is announced on `team_events`;
/// the user and task services pick it up from there.
pub async fn join_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<JoinTeamRequest>,
) -> ApiResult<Json<Team>> {
    let team = Team::find_by_invite_code(&state.pool, &req.invite_code)
        .await?
        .ok_or_else(|| ApiError::NotFound("invalid invite code".to_string()))?;

    state
        .publisher
        .publish(
            exchanges::TEAM_EVENTS,
            routing_keys::TEAM_USER_ASSIGNED,
            &TeamUserAssigned {
                user_id: auth.user_id,
                team_id: team.id,
            },
        )
        .await;

    Ok(Json(team))
}

/// Check an invite code without joining. Unauthenticated so sign-up flows
/// can show the team before the account exists.
pub async fn validate_invite(
    State(state): State<AppState>,
    Query(query): Query<ValidateInviteQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    match Team::find_by_invite_code(&state.pool, &query.code).await? {
        Some(team) => Ok(Json(serde_json::json!({
            "valid": true,
            "team_id": team.id,
            "name": team.name,
        }))),
        None => Ok(Json(serde_json::json!({ "valid": false }))),
    }
}

/// Deactivate a team. Publishes only when this call actually flipped the
/// flag, so a repeat delete cannot re-announce.
pub async fn delete_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let team = Team::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("team not found".to_string()))?;
    if team.owner_id != Some(auth.user_id) {
        return Err(ApiError::Forbidden("only the owner can delete a team".to_string()));
    }

    let deactivated = Team::deactivate(&state.pool, id).await?;
    if deactivated > 0 {
        state
            .publisher
            .publish(
                exchanges::TEAM_EVENTS,
                routing_keys::TEAM_DEACTIVATED,
                &TeamDeactivated { team_id: id },
            )
            .await;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_org_unit(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(req): Json<CreateOrgUnitRequest>,
) -> ApiResult<(StatusCode, Json<OrgUnit>)> {
    if Team::find_by_id(&state.pool, req.team_id).await?.is_none() {
        return Err(ApiError::NotFound("team not found".to_string()));
    }
    if let Some(parent_id) = req.parent_id {
        let parent = OrgUnit::find_by_id(&state.pool, parent_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("parent org unit not found".to_string()))?;
        if parent.team_id != req.team_id {
            return Err(ApiError::Unprocessable(
                "parent org unit belongs to another team".to_string(),
            ));
        }
    }

    let unit = OrgUnit::create(
        &state.pool,
        req.team_id,
        &req.name,
        req.parent_id,
        req.description.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

pub async fn get_org_unit(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrgUnit>> {
    let unit = OrgUnit::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("org unit not found".to_string()))?;
    Ok(Json(unit))
}

pub async fn list_team_org_units(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(team_id): Path<i64>,
) -> ApiResult<Json<Vec<OrgUnit>>> {
    Ok(Json(OrgUnit::list_by_team(&state.pool, team_id).await?))
}

pub async fn delete_org_unit(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let unit = OrgUnit::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("org unit not found".to_string()))?;

    let deactivated = OrgUnit::deactivate(&state.pool, id).await?;
    if deactivated > 0 {
        state
            .publisher
            .publish(
                exchanges::TEAM_EVENTS,
                routing_keys::ORG_UNIT_DEACTIVATED,
                &OrgUnitDeactivated {
                    org_unit_id: unit.id,
                    team_id: unit.team_id,
                },
            )
            .await;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_org_member(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(org_unit_id): Path<i64>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<OrgMember>)> {
    if OrgUnit::find_by_id(&state.pool, org_unit_id).await?.is_none() {
        return Err(ApiError::NotFound("org unit not found".to_string()));
    }
    if OrgMember::exists_active(&state.pool, req.user_id, org_unit_id).await? {
        return Err(ApiError::Conflict(
            "user is already a member of this org unit".to_string(),
            None,
        ));
    }

    let member = OrgMember::create(
        &state.pool,
        req.user_id,
        org_unit_id,
        req.position.as_deref(),
        req.manager_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn list_org_members(
    State(state): State<AppState>,
    Path(org_unit_id): Path<i64>,
) -> ApiResult<Json<Vec<OrgMember>>> {
    let members = sqlx::query_as::<_, OrgMember>(
        "SELECT * FROM org_members WHERE org_unit_id = $1 AND is_active = TRUE ORDER BY id",
    )
    .bind(org_unit_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(members))
}

pub async fn get_managers_chain(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Vec<OrgMember>>> {
    Ok(Json(OrgMember::managers_chain(&state.pool, user_id).await?))
}

pub async fn get_subordinates(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Vec<SubordinateNode>>> {
    Ok(Json(
        OrgMember::subordinates_tree(&state.pool, user_id).await?,
    ))
}
