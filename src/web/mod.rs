//! # HTTP Layer
//!
//! One router per service binary, all sharing [`state::AppState`], the
//! bearer-token extractor, and the common error surface.

pub mod auth;
pub mod errors;
pub mod handlers;
pub mod state;

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;

use state::AppState;

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub fn user_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(handlers::users::register))
        .route("/auth/login", post(handlers::users::login))
        .route("/users/me", get(handlers::users::me).patch(handlers::users::update_me))
        .route(
            "/users/{id}",
            get(handlers::users::get_user).delete(handlers::users::delete_user),
        )
        .route("/users/{id}/status", put(handlers::users::set_status))
        .with_state(state)
}

pub fn team_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/teams", post(handlers::teams::create_team))
        .route(
            "/teams/{id}",
            get(handlers::teams::get_team).delete(handlers::teams::delete_team),
        )
        .route("/teams/join", post(handlers::teams::join_team))
        .route("/teams/invites/validate", get(handlers::teams::validate_invite))
        .route("/teams/{id}/org-units", get(handlers::teams::list_team_org_units))
        .route("/org-units", post(handlers::teams::create_org_unit))
        .route(
            "/org-units/{id}",
            get(handlers::teams::get_org_unit).delete(handlers::teams::delete_org_unit),
        )
        .route(
            "/org-units/{id}/members",
            post(handlers::teams::add_org_member).get(handlers::teams::list_org_members),
        )
        .route("/users/{id}/managers", get(handlers::teams::get_managers_chain))
        .route("/users/{id}/subordinates", get(handlers::teams::get_subordinates))
        .with_state(state)
}

pub fn task_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", post(handlers::tasks::create_task).get(handlers::tasks::list_tasks))
        .route(
            "/tasks/{id}",
            get(handlers::tasks::get_task).delete(handlers::tasks::delete_task),
        )
        .route("/tasks/{id}/status", put(handlers::tasks::update_task_status))
        .route(
            "/tasks/{id}/comments",
            post(handlers::tasks::create_comment).get(handlers::tasks::list_comments),
        )
        .route("/comments/{id}", delete(handlers::tasks::delete_comment))
        .route(
            "/tasks/{id}/evaluations",
            post(handlers::tasks::evaluate_task).get(handlers::tasks::list_evaluations),
        )
        .route("/tasks/{id}/metrics", get(handlers::tasks::task_metrics))
        .route("/users/{id}/performance", get(handlers::tasks::user_performance))
        .route(
            "/users/{id}/evaluations/matrix",
            get(handlers::tasks::user_evaluation_matrix),
        )
        .route("/teams/{id}/performance", get(handlers::tasks::team_performance_report))
        .route(
            "/org-units/{id}/performance",
            get(handlers::tasks::org_unit_performance_report),
        )
        .with_state(state)
}

pub fn calendar_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/events",
            post(handlers::calendar::create_event).get(handlers::calendar::list_events),
        )
        .route(
            "/events/{id}",
            get(handlers::calendar::get_event)
                .put(handlers::calendar::update_event)
                .delete(handlers::calendar::cancel_event),
        )
        .route("/meetings", post(handlers::calendar::create_meeting))
        .route("/availability/check", post(handlers::calendar::check_availability))
        .route(
            "/availability/me",
            get(handlers::calendar::get_my_availability)
                .put(handlers::calendar::update_my_availability),
        )
        .with_state(state)
}
