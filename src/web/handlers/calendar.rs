//! Calendar-service routes: events, conflict-checked meetings, and
//! availability. Slot collisions surface as 409 responses carrying the full
//! validation report, including suggested alternative times.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::events::{
    exchanges, routing_keys, AvailabilityChanged, CalendarEventCancelled, CalendarEventCreated,
    CalendarEventUpdated,
};
use crate::models::{
    AvailabilityStatus, CalendarEvent, EventKind, NewCalendarEvent, UserAvailability,
};
use crate::scheduling::{
    check_organizer_permissions, create_meeting_with_validation,
    validate_participants_availability, MeetingOutcome, MeetingRequest, ValidationReport,
};
use crate::web::auth::AuthUser;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub event_type: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub status: Option<String>,
    pub work_start: Option<String>,
    pub work_end: Option<String>,
}

fn parse_event_kind(raw: Option<&str>) -> Result<EventKind, ApiError> {
    match raw {
        None | Some("personal") => Ok(EventKind::Personal),
        Some("meeting") => Ok(EventKind::Meeting),
        Some("reminder") => Ok(EventKind::Reminder),
        Some("task") => Ok(EventKind::Task),
        Some(other) => Err(ApiError::Unprocessable(format!("unknown event type: {other}"))),
    }
}

fn conflict_response(report: crate::scheduling::ValidationReport) -> ApiError {
    ApiError::Conflict(
        "the requested slot conflicts with existing events".to_string(),
        Some(json!({
            "conflicts": report.conflicts,
            "unavailable_users": report.unavailable_users,
            "suggested_times": report.suggested_times,
        })),
    )
}

/// Create a personal event. The owner's own calendar is conflict-checked;
/// collisions come back as 409 with alternatives.
pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<CalendarEvent>)> {
    if req.end_at <= req.start_at {
        return Err(ApiError::BadRequest("event must end after it starts".to_string()));
    }
    let kind = parse_event_kind(req.event_type.as_deref())?;

    let report = validate_participants_availability(
        &state.pool,
        &[auth.user_id],
        req.start_at,
        req.end_at,
        None,
    )
    .await?;
    if !report.is_valid {
        return Err(conflict_response(report));
    }

    let event = CalendarEvent::create(
        &state.pool,
        NewCalendarEvent {
            title: req.title,
            description: req.description,
            owner_id: auth.user_id,
            event_type: kind,
            start_at: req.start_at,
            end_at: req.end_at,
            participants: None,
            task_id: None,
            location: req.location,
        },
    )
    .await?;

    state
        .publisher
        .publish(
            exchanges::CALENDAR_EVENTS,
            routing_keys::CALENDAR_EVENT_CREATED,
            &CalendarEventCreated {
                event_id: event.id,
                user_id: event.owner_id,
                title: event.title.clone(),
                start_at: event.start_at,
                end_at: event.end_at,
                kind: event.event_type.clone(),
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn get_event(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<CalendarEvent>> {
    let event = CalendarEvent::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;
    Ok(Json(event))
}

/// The caller's calendar over a window, defaulting to the next seven days.
pub async fn list_events(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListEventsQuery>,
) -> ApiResult<Json<Vec<CalendarEvent>>> {
    let from = query.from.unwrap_or_else(Utc::now);
    let to = query.to.unwrap_or_else(|| from + Duration::days(7));
    if to <= from {
        return Err(ApiError::BadRequest("window must end after it starts".to_string()));
    }
    let events = CalendarEvent::list_for_user(&state.pool, auth.user_id, from, to).await?;
    Ok(Json(events))
}

/// Reschedule an event. The event itself is excluded from the conflict
/// check so an unchanged slot always validates.
pub async fn update_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEventRequest>,
) -> ApiResult<Json<CalendarEvent>> {
    if req.end_at <= req.start_at {
        return Err(ApiError::BadRequest("event must end after it starts".to_string()));
    }
    let event = CalendarEvent::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;
    if event.owner_id != auth.user_id {
        return Err(ApiError::Forbidden("only the owner can modify an event".to_string()));
    }

    let mut checked = event.participant_ids();
    checked.push(event.owner_id);
    let report = validate_participants_availability(
        &state.pool,
        &checked,
        req.start_at,
        req.end_at,
        Some(id),
    )
    .await?;
    if !report.is_valid {
        return Err(conflict_response(report));
    }

    let updated = CalendarEvent::update_times(&state.pool, id, req.start_at, req.end_at)
        .await?
        .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;

    state
        .publisher
        .publish(
            exchanges::CALENDAR_EVENTS,
            routing_keys::CALENDAR_EVENT_UPDATED,
            &CalendarEventUpdated {
                event_id: updated.id,
                user_id: updated.owner_id,
                updated_fields: vec!["start_at".to_string(), "end_at".to_string()],
            },
        )
        .await;

    Ok(Json(updated))
}

pub async fn cancel_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let event = CalendarEvent::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;
    if event.owner_id != auth.user_id {
        return Err(ApiError::Forbidden("only the owner can cancel an event".to_string()));
    }

    let cancelled = CalendarEvent::cancel(&state.pool, id).await?;
    if cancelled > 0 {
        state
            .publisher
            .publish(
                exchanges::CALENDAR_EVENTS,
                routing_keys::CALENDAR_EVENT_CANCELLED,
                &CalendarEventCancelled {
                    event_id: event.id,
                    user_id: event.owner_id,
                    title: event.title.clone(),
                },
            )
            .await;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CreateMeetingRequest {
    pub title: String,
    pub description: Option<String>,
    pub participants: Vec<i64>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub location: Option<String>,
    pub team_id: Option<i64>,
    pub org_unit_id: Option<i64>,
}

/// Schedule a meeting across participants. When an org unit is named, the
/// organizer must belong to it; the membership probe fails open if the team
/// service is unreachable.
pub async fn create_meeting(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateMeetingRequest>,
) -> ApiResult<(StatusCode, Json<CalendarEvent>)> {
    if req.end_at <= req.start_at {
        return Err(ApiError::BadRequest("meeting must end after it starts".to_string()));
    }
    if req.participants.is_empty() {
        return Err(ApiError::Unprocessable(
            "a meeting needs at least one participant".to_string(),
        ));
    }

    if let Some(org_unit_id) = req.org_unit_id {
        let allowed = check_organizer_permissions(
            &state.http,
            &state.config.team_service_url,
            auth.user_id,
            org_unit_id,
        )
        .await;
        if !allowed {
            return Err(ApiError::Forbidden(
                "organizer is not a member of the org unit".to_string(),
            ));
        }
    }

    let outcome = create_meeting_with_validation(
        &state.pool,
        &state.publisher,
        MeetingRequest {
            title: req.title,
            description: req.description,
            organizer_id: auth.user_id,
            participants: req.participants,
            start_at: req.start_at,
            end_at: req.end_at,
            location: req.location,
            team_id: req.team_id,
            org_unit_id: req.org_unit_id,
        },
    )
    .await?;

    match outcome {
        MeetingOutcome::Created(event) => Ok((StatusCode::CREATED, Json(event))),
        MeetingOutcome::Conflicts(report) => Err(conflict_response(report)),
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckAvailabilityRequest {
    pub participants: Vec<i64>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub exclude_event_id: Option<i64>,
}

/// Dry-run slot validation: the full conflict report without creating
/// anything. Used by clients to probe before submitting a meeting.
pub async fn check_availability(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CheckAvailabilityRequest>,
) -> ApiResult<Json<ValidationReport>> {
    if req.end_at <= req.start_at {
        return Err(ApiError::BadRequest("window must end after it starts".to_string()));
    }
    let mut participants = req.participants;
    if participants.is_empty() {
        participants.push(auth.user_id);
    }

    let report = validate_participants_availability(
        &state.pool,
        &participants,
        req.start_at,
        req.end_at,
        req.exclude_event_id,
    )
    .await?;
    Ok(Json(report))
}

pub async fn get_my_availability(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<UserAvailability>> {
    Ok(Json(
        UserAvailability::ensure_default(&state.pool, auth.user_id).await?,
    ))
}

pub async fn update_my_availability(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateAvailabilityRequest>,
) -> ApiResult<Json<UserAvailability>> {
    let status = match req.status.as_deref() {
        Some(raw) => Some(
            AvailabilityStatus::parse(raw)
                .ok_or_else(|| ApiError::Unprocessable(format!("unknown status: {raw}")))?,
        ),
        None => None,
    };
    for value in [req.work_start.as_deref(), req.work_end.as_deref()].into_iter().flatten() {
        if !is_valid_time_of_day(value) {
            return Err(ApiError::Unprocessable(format!(
                "working hours must be HH:MM, got {value}"
            )));
        }
    }

    let availability = UserAvailability::update(
        &state.pool,
        auth.user_id,
        status,
        req.work_start.as_deref(),
        req.work_end.as_deref(),
    )
    .await?;

    state
        .publisher
        .publish(
            exchanges::CALENDAR_EVENTS,
            routing_keys::USER_AVAILABILITY_UPDATED,
            &AvailabilityChanged {
                user_id: auth.user_id,
                work_start_time: availability.work_start.clone(),
                work_end_time: availability.work_end.clone(),
            },
        )
        .await;

    Ok(Json(availability))
}

/// Zero-padded `HH:MM`, the only form that compares correctly as a string.
fn is_valid_time_of_day(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let (Ok(hours), Ok(minutes)) = (value[0..2].parse::<u8>(), value[3..5].parse::<u8>()) else {
        return false;
    };
    hours < 24 && minutes < 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_validation() {
        assert!(is_valid_time_of_day("09:00"));
        assert!(is_valid_time_of_day("23:59"));
        assert!(!is_valid_time_of_day("9:00"));
        assert!(!is_valid_time_of_day("24:00"));
        assert!(!is_valid_time_of_day("09:60"));
        assert!(!is_valid_time_of_day("0900"));
    }
}
