//! # Domain Events
//!
//! Envelope format, typed payloads, and the fire-and-forget publisher.
//! Routing keys follow `<entity>.<verb>`; each service publishes to its own
//! topic exchange and consumes from the exchanges of the services it cares
//! about. Delivery is notification, not RPC: there is no reply correlation.

pub mod envelope;
pub mod publisher;

pub use envelope::{
    AvailabilityChanged, CalendarEventCancelled, CalendarEventCreated, CalendarEventUpdated,
    EventEnvelope, MeetingParticipantInvited, MeetingScheduled, OrgUnitDeactivated, TaskCreated,
    TaskEvaluated, TaskStatusChanged, TeamDeactivated, TeamUserAssigned, UserStatusChanged,
};
pub use publisher::EventPublisher;

/// One topic exchange per domain.
pub mod exchanges {
    pub const USER_EVENTS: &str = "user_events";
    pub const TEAM_EVENTS: &str = "team_events";
    pub const TASK_EVENTS: &str = "task_events";
    pub const CALENDAR_EVENTS: &str = "calendar_events";
}

/// Routing keys, `<entity>.<verb>`.
pub mod routing_keys {
    pub const USER_STATUS_CHANGED: &str = "user.status_changed";

    pub const TEAM_USER_ASSIGNED: &str = "team.user_assigned";
    pub const TEAM_DEACTIVATED: &str = "team.deactivated";
    pub const ORG_UNIT_DEACTIVATED: &str = "org_unit.deactivated";

    pub const TASK_CREATED: &str = "task.created";
    pub const TASK_STATUS_CHANGED: &str = "task.status_changed";
    pub const TASK_EVALUATED: &str = "task.evaluated";

    pub const CALENDAR_EVENT_CREATED: &str = "calendar_event.created";
    pub const CALENDAR_EVENT_UPDATED: &str = "calendar_event.updated";
    pub const CALENDAR_EVENT_CANCELLED: &str = "calendar_event.cancelled";
    pub const MEETING_SCHEDULED: &str = "meeting.scheduled";
    pub const MEETING_PARTICIPANT_INVITED: &str = "meeting.participant_invited";
    pub const USER_AVAILABILITY_UPDATED: &str = "user_availability.updated";
}
