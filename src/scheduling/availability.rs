//! Participant availability checks and the validated meeting-creation flow.
//!
//! Validation collects everything wrong with a proposed slot in one pass
//! (busy participants, off-hours participants, unavailable statuses) rather
//! than failing on the first finding, so the client can render a complete
//! conflict report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};

use super::{
    intervals_overlap, shifted_start, within_work_hours, MAX_SUGGESTIONS, SUGGESTION_OFFSETS,
};
use crate::events::{
    exchanges, routing_keys, EventPublisher, MeetingParticipantInvited, MeetingScheduled,
};
use crate::models::{
    AvailabilityStatus, CalendarEvent, EventKind, NewCalendarEvent, UserAvailability,
};

/// Timeout on the hierarchy probe to the team service.
const PERMISSION_CHECK_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConflict {
    pub user_id: i64,
    pub reason: ConflictReason,
    /// Set for busy conflicts: the event occupying the slot.
    pub event_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    Busy,
    OutsideWorkHours,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedSlot {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub conflicts: Vec<UserConflict>,
    pub unavailable_users: Vec<i64>,
    pub suggested_times: Vec<SuggestedSlot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingRequest {
    pub title: String,
    pub description: Option<String>,
    pub organizer_id: i64,
    pub participants: Vec<i64>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub location: Option<String>,
    pub team_id: Option<i64>,
    pub org_unit_id: Option<i64>,
}

/// Outcome of a validated meeting request.
#[derive(Debug)]
pub enum MeetingOutcome {
    Created(CalendarEvent),
    Conflicts(ValidationReport),
}

/// Check every participant against the proposed slot. Availability rows are
/// created lazily with defaults, so never-seen users validate against the
/// standard working day.
pub async fn validate_participants_availability(
    pool: &PgPool,
    participant_ids: &[i64],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_event_id: Option<i64>,
) -> Result<ValidationReport, sqlx::Error> {
    let mut conflicts = Vec::new();
    let mut unavailable_users = Vec::new();

    for &user_id in participant_ids {
        let availability = UserAvailability::ensure_default(pool, user_id).await?;

        if availability.status() != Some(AvailabilityStatus::Available) {
            unavailable_users.push(user_id);
        }

        if !within_work_hours(start, end, &availability.work_start, &availability.work_end) {
            conflicts.push(UserConflict {
                user_id,
                reason: ConflictReason::OutsideWorkHours,
                event_id: None,
            });
        }

        let busy = CalendarEvent::overlapping(pool, user_id, start, end, exclude_event_id).await?;
        for event in busy {
            conflicts.push(UserConflict {
                user_id,
                reason: ConflictReason::Busy,
                event_id: Some(event.id),
            });
        }
    }

    let is_valid = conflicts.is_empty() && unavailable_users.is_empty();
    let suggested_times = if is_valid {
        Vec::new()
    } else {
        suggest_alternative_times(pool, participant_ids, start, end, exclude_event_id).await?
    };

    Ok(ValidationReport {
        is_valid,
        conflicts,
        unavailable_users,
        suggested_times,
    })
}

/// Probe nearby start times (same duration) and keep those where every
/// participant is free and inside work hours. Stops at [`MAX_SUGGESTIONS`].
pub async fn suggest_alternative_times(
    pool: &PgPool,
    participant_ids: &[i64],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_event_id: Option<i64>,
) -> Result<Vec<SuggestedSlot>, sqlx::Error> {
    let duration = end - start;
    let mut suggestions = Vec::new();

    for offset in SUGGESTION_OFFSETS {
        if suggestions.len() >= MAX_SUGGESTIONS {
            break;
        }
        let Some(candidate_start) = shifted_start(start, offset) else {
            continue;
        };
        let candidate_end = candidate_start + duration;

        if slot_is_free(pool, participant_ids, candidate_start, candidate_end, exclude_event_id)
            .await?
        {
            suggestions.push(SuggestedSlot {
                start_at: candidate_start,
                end_at: candidate_end,
            });
        }
    }

    Ok(suggestions)
}

/// One participant's verdict on a slot, applying the same checks as
/// [`validate_participants_availability`]: availability status, working
/// window, and busy overlaps.
fn participant_slot_open(
    availability: &UserAvailability,
    busy: &[CalendarEvent],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    availability.status() == Some(AvailabilityStatus::Available)
        && within_work_hours(start, end, &availability.work_start, &availability.work_end)
        && !busy
            .iter()
            .any(|e| intervals_overlap(start, end, e.start_at, e.end_at))
}

async fn slot_is_free(
    pool: &PgPool,
    participant_ids: &[i64],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_event_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    for &user_id in participant_ids {
        let availability = UserAvailability::ensure_default(pool, user_id).await?;
        let busy = CalendarEvent::overlapping(pool, user_id, start, end, exclude_event_id).await?;
        if !participant_slot_open(&availability, &busy, start, end) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Validate and, if the slot holds, create the meeting and announce it.
/// The organizer counts as a participant for conflict purposes. Callers
/// reject inverted time ranges before getting here.
pub async fn create_meeting_with_validation(
    pool: &PgPool,
    publisher: &EventPublisher,
    request: MeetingRequest,
) -> Result<MeetingOutcome, sqlx::Error> {
    let mut everyone = request.participants.clone();
    if !everyone.contains(&request.organizer_id) {
        everyone.push(request.organizer_id);
    }

    let report = validate_participants_availability(
        pool,
        &everyone,
        request.start_at,
        request.end_at,
        None,
    )
    .await?;
    if !report.is_valid {
        return Ok(MeetingOutcome::Conflicts(report));
    }

    let event = CalendarEvent::create(
        pool,
        NewCalendarEvent {
            title: request.title.clone(),
            description: request.description.clone(),
            owner_id: request.organizer_id,
            event_type: EventKind::Meeting,
            start_at: request.start_at,
            end_at: request.end_at,
            participants: Some(request.participants.clone()),
            task_id: None,
            location: request.location.clone(),
        },
    )
    .await?;

    info!(
        event_id = event.id,
        organizer_id = request.organizer_id,
        participants = request.participants.len(),
        "meeting scheduled"
    );

    publisher
        .publish(
            exchanges::CALENDAR_EVENTS,
            routing_keys::MEETING_SCHEDULED,
            &MeetingScheduled {
                event_id: event.id,
                organizer_id: request.organizer_id,
                participants: request.participants.clone(),
                start_at: request.start_at,
                end_at: request.end_at,
                team_id: request.team_id,
                org_unit_id: request.org_unit_id,
            },
        )
        .await;

    for &participant_id in &request.participants {
        publisher
            .publish(
                exchanges::CALENDAR_EVENTS,
                routing_keys::MEETING_PARTICIPANT_INVITED,
                &MeetingParticipantInvited {
                    event_id: event.id,
                    participant_id,
                    organizer_id: request.organizer_id,
                    title: request.title.clone(),
                    start_at: request.start_at,
                    end_at: request.end_at,
                    location: request.location.clone(),
                },
            )
            .await;
    }

    Ok(MeetingOutcome::Created(event))
}

#[derive(Debug, Deserialize)]
struct HierarchyMember {
    user_id: i64,
}

/// Ask the team service whether the organizer manages the target unit.
/// Fails open: if the team service is down or slow, the meeting goes
/// through rather than blocking on an auxiliary check.
pub async fn check_organizer_permissions(
    http: &reqwest::Client,
    team_service_url: &str,
    organizer_id: i64,
    org_unit_id: i64,
) -> bool {
    let url = format!("{team_service_url}/org-units/{org_unit_id}/members");
    let response = http
        .get(&url)
        .timeout(PERMISSION_CHECK_TIMEOUT)
        .send()
        .await;

    match response {
        Ok(response) if response.status().is_success() => {
            match response.json::<Vec<HierarchyMember>>().await {
                Ok(members) => members.iter().any(|m| m.user_id == organizer_id),
                Err(e) => {
                    warn!(error = %e, "unreadable hierarchy response, allowing");
                    true
                }
            }
        }
        Ok(response) => {
            warn!(status = %response.status(), "hierarchy check failed, allowing");
            true
        }
        Err(e) => {
            warn!(error = %e, "team service unreachable, allowing");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
    }

    fn availability(status: &str) -> UserAvailability {
        UserAvailability {
            id: 1,
            user_id: 5,
            status: status.to_string(),
            work_start: "09:00".to_string(),
            work_end: "18:00".to_string(),
            updated_at: Utc::now(),
        }
    }

    fn event(start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            id: 10,
            title: "existing".to_string(),
            description: None,
            owner_id: 5,
            event_type: "meeting".to_string(),
            status: "scheduled".to_string(),
            start_at: start,
            end_at: end,
            participants: None,
            task_id: None,
            location: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn open_slot_inside_work_hours_passes() {
        assert!(participant_slot_open(
            &availability("available"),
            &[],
            at(10, 0),
            at(11, 0),
        ));
    }

    #[test]
    fn unavailable_status_closes_every_slot() {
        for status in ["busy", "away", "do_not_disturb"] {
            assert!(!participant_slot_open(
                &availability(status),
                &[],
                at(10, 0),
                at(11, 0),
            ));
        }
    }

    #[test]
    fn busy_overlap_closes_the_slot_but_touching_does_not() {
        let busy = [event(at(10, 30), at(11, 30))];
        assert!(!participant_slot_open(&availability("available"), &busy, at(10, 0), at(11, 0)));
        assert!(participant_slot_open(&availability("available"), &busy, at(9, 30), at(10, 30)));
    }

    #[test]
    fn off_hours_slot_is_closed() {
        assert!(!participant_slot_open(
            &availability("available"),
            &[],
            at(7, 0),
            at(8, 0),
        ));
    }
}
