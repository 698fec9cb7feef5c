//! Task-service routes: task lifecycle, comments, evaluations, and the
//! performance reports built from them.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::events::{exchanges, routing_keys, TaskCreated, TaskEvaluated, TaskStatusChanged};
use crate::models::{
    NewTask, Task, TaskComment, TaskEvaluation, TaskPriority, TaskStatus, UserPerformance,
};
use crate::performance::{
    criteria_breakdown, execution_metrics, mean_score, org_unit_performance, quarter_bounds,
    recompute_user_performance, team_performance, validate_criteria, GroupPerformance,
};
use crate::web::auth::AuthUser;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<i64>,
    pub team_id: Option<i64>,
    pub org_unit_id: Option<i64>,
    pub priority: Option<String>,
    pub due_at: Option<chrono::DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub assignee_id: Option<i64>,
    pub team_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub actual_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateTaskRequest {
    pub criteria: Map<String, Value>,
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    /// Any date inside the wanted quarter; defaults to today.
    pub date: Option<NaiveDate>,
}

pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Unprocessable("task title must not be empty".to_string()));
    }
    let priority = match req.priority.as_deref() {
        Some(raw) => Some(
            TaskPriority::parse(raw)
                .ok_or_else(|| ApiError::Unprocessable(format!("unknown priority: {raw}")))?,
        ),
        None => None,
    };

    let task = Task::create(
        &state.pool,
        NewTask {
            title: req.title.trim().to_string(),
            description: req.description,
            creator_id: auth.user_id,
            assignee_id: req.assignee_id,
            team_id: req.team_id,
            org_unit_id: req.org_unit_id,
            priority,
            due_at: req.due_at,
            estimated_hours: req.estimated_hours,
        },
    )
    .await?;

    state
        .publisher
        .publish(
            exchanges::TASK_EVENTS,
            routing_keys::TASK_CREATED,
            &TaskCreated {
                task_id: task.id,
                title: task.title.clone(),
                assignee_id: task.assignee_id,
                team_id: task.team_id,
                due_at: task.due_at,
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("task not found".to_string()))?;
    Ok(Json(task))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = match (query.assignee_id, query.team_id) {
        (Some(assignee_id), _) => Task::list_by_assignee(&state.pool, assignee_id).await?,
        (None, Some(team_id)) => Task::list_by_team(&state.pool, team_id).await?,
        (None, None) => Task::list_by_assignee(&state.pool, auth.user_id).await?,
    };
    Ok(Json(tasks))
}

/// Apply a status transition. Illegal moves (skips, backward moves, leaving a
/// terminal state) are rejected before any write.
pub async fn update_task_status(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Task>> {
    let new_status = TaskStatus::parse(&req.status)
        .ok_or_else(|| ApiError::Unprocessable(format!("unknown status: {}", req.status)))?;

    let task = Task::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("task not found".to_string()))?;
    let current = task
        .status()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("corrupt task status: {}", task.status)))?;

    if !current.can_transition_to(new_status) {
        return Err(ApiError::BadRequest(format!(
            "cannot move task from {} to {}",
            current.as_str(),
            new_status.as_str()
        )));
    }

    let task = Task::update_status(&state.pool, id, new_status, req.actual_hours)
        .await?
        .ok_or_else(|| ApiError::NotFound("task not found".to_string()))?;

    state
        .publisher
        .publish(
            exchanges::TASK_EVENTS,
            routing_keys::TASK_STATUS_CHANGED,
            &TaskStatusChanged {
                task_id: task.id,
                status: new_status.as_str().to_string(),
                assignee_id: task.assignee_id,
                team_id: task.team_id,
            },
        )
        .await;

    Ok(Json(task))
}

/// DELETE is cancellation: tasks are soft-deleted through the status
/// machine, so a terminal task cannot be deleted again.
pub async fn delete_task(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let task = Task::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("task not found".to_string()))?;
    let current = task
        .status()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("corrupt task status: {}", task.status)))?;

    if !current.can_transition_to(TaskStatus::Cancelled) {
        return Err(ApiError::BadRequest(format!(
            "cannot cancel a {} task",
            current.as_str()
        )));
    }

    let task = Task::update_status(&state.pool, id, TaskStatus::Cancelled, None)
        .await?
        .ok_or_else(|| ApiError::NotFound("task not found".to_string()))?;

    state
        .publisher
        .publish(
            exchanges::TASK_EVENTS,
            routing_keys::TASK_STATUS_CHANGED,
            &TaskStatusChanged {
                task_id: task.id,
                status: TaskStatus::Cancelled.as_str().to_string(),
                assignee_id: task.assignee_id,
                team_id: task.team_id,
            },
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<TaskComment>)> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Unprocessable("comment must not be empty".to_string()));
    }
    if Task::find_by_id(&state.pool, task_id).await?.is_none() {
        return Err(ApiError::NotFound("task not found".to_string()));
    }
    let comment =
        TaskComment::create(&state.pool, task_id, auth.user_id, req.content.trim()).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<TaskComment>>> {
    Ok(Json(TaskComment::list_by_task(&state.pool, task_id).await?))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let comment = TaskComment::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;
    if comment.author_id != auth.user_id {
        return Err(ApiError::Forbidden("can only delete own comments".to_string()));
    }
    TaskComment::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Evaluate a completed task. The score is the mean of the criteria; the
/// assignee's quarterly performance row is rebuilt in the same request.
pub async fn evaluate_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<i64>,
    Json(req): Json<EvaluateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskEvaluation>)> {
    let task = Task::find_by_id(&state.pool, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("task not found".to_string()))?;
    if task.status() != Some(TaskStatus::Completed) {
        return Err(ApiError::BadRequest(
            "only completed tasks can be evaluated".to_string(),
        ));
    }

    validate_criteria(&req.criteria)?;
    let score = mean_score(&req.criteria);

    let evaluation = TaskEvaluation::create(
        &state.pool,
        task_id,
        auth.user_id,
        &Value::Object(req.criteria.clone()),
        score,
        req.feedback.as_deref(),
    )
    .await?;

    if let (Some(assignee_id), Some(completed_at)) = (task.assignee_id, task.completed_at) {
        let (period_start, period_end) = quarter_bounds(completed_at.date_naive());
        recompute_user_performance(&state.pool, assignee_id, period_start, period_end).await?;
    }

    state
        .publisher
        .publish(
            exchanges::TASK_EVENTS,
            routing_keys::TASK_EVALUATED,
            &TaskEvaluated {
                task_id,
                evaluator_id: auth.user_id,
                score,
                criteria: req.criteria,
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(evaluation)))
}

pub async fn list_evaluations(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<TaskEvaluation>>> {
    Ok(Json(TaskEvaluation::list_for_task(&state.pool, task_id).await?))
}

/// Metrics for one task: evaluation summary (overall mean plus per-criterion
/// means) alongside execution figures derived from its timestamps.
pub async fn task_metrics(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let task = Task::find_by_id(&state.pool, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("task not found".to_string()))?;
    let evaluations = TaskEvaluation::list_for_task(&state.pool, task_id).await?;
    let scores: Vec<f64> = evaluations.iter().filter_map(|e| e.score).collect();
    let average = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };
    let execution = execution_metrics(&task, Utc::now());

    Ok(Json(serde_json::json!({
        "task_id": task_id,
        "status": task.status,
        "evaluation_count": evaluations.len(),
        "average_score": average,
        "criteria": criteria_breakdown(&evaluations),
        "execution": execution,
    })))
}

/// Per-criterion score matrix for one user over a quarter, built from every
/// evaluation of their tasks completed in that period.
pub async fn user_evaluation_matrix(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<i64>,
    Query(query): Query<PerformanceQuery>,
) -> ApiResult<Json<Value>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let (period_start, period_end) = quarter_bounds(date);
    let evaluations =
        TaskEvaluation::list_for_assignee_in_period(&state.pool, user_id, period_start, period_end)
            .await?;
    let scores: Vec<f64> = evaluations.iter().filter_map(|e| e.score).collect();
    let average = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "period_start": period_start,
        "period_end": period_end,
        "evaluation_count": evaluations.len(),
        "average_score": average,
        "criteria": criteria_breakdown(&evaluations),
    })))
}

pub async fn user_performance(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<i64>,
    Query(query): Query<PerformanceQuery>,
) -> ApiResult<Json<UserPerformance>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let (period_start, period_end) = quarter_bounds(date);
    let row = recompute_user_performance(&state.pool, user_id, period_start, period_end).await?;
    Ok(Json(row))
}

pub async fn team_performance_report(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(team_id): Path<i64>,
    Query(query): Query<PerformanceQuery>,
) -> ApiResult<Json<GroupPerformance>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let (period_start, period_end) = quarter_bounds(date);
    let report = team_performance(&state.pool, team_id, period_start, period_end).await?;
    Ok(Json(report))
}

pub async fn org_unit_performance_report(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(org_unit_id): Path<i64>,
    Query(query): Query<PerformanceQuery>,
) -> ApiResult<Json<GroupPerformance>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let (period_start, period_end) = quarter_bounds(date);
    let report = org_unit_performance(&state.pool, org_unit_id, period_start, period_end).await?;
    Ok(Json(report))
}
