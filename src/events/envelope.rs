//! Wire format for domain events.
//!
//! The JSON body carries `event_type` (always equal to the routing key)
//! alongside the payload fields, so consumers bound to wildcard patterns can
//! switch on the type without inspecting the delivery metadata.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_type: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl EventEnvelope {
    /// Wrap a typed payload. The payload must serialize to a JSON object.
    ///
    /// A payload key named `event_type` would collide with the envelope's own
    /// field on the wire (duplicate JSON keys, undecodable by consumers), so
    /// it is stripped here; the routing key always wins.
    pub fn new<T: Serialize>(
        event_type: &str,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(payload)?;
        let mut payload = match value {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("payload".to_string(), other);
                map
            }
        };
        payload.remove("event_type");
        Ok(Self {
            event_type: event_type.to_string(),
            payload,
        })
    }

    /// Extract the typed payload back out of the envelope.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.payload.clone()))
    }
}

// Payloads always carry the mutated entity's id plus the foreign ids the
// recipients filter on.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatusChanged {
    pub user_id: i64,
    pub new_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamUserAssigned {
    pub user_id: i64,
    pub team_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamDeactivated {
    pub team_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgUnitDeactivated {
    pub org_unit_id: i64,
    pub team_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCreated {
    pub task_id: i64,
    pub title: String,
    pub assignee_id: Option<i64>,
    pub team_id: Option<i64>,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusChanged {
    pub task_id: i64,
    pub status: String,
    pub assignee_id: Option<i64>,
    pub team_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvaluated {
    pub task_id: i64,
    pub evaluator_id: i64,
    pub score: f64,
    pub criteria: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEventCreated {
    pub event_id: i64,
    pub user_id: i64,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// The event kind (meeting, task, ...). Named `kind` on the wire: the
    /// envelope already owns `event_type` for the routing key.
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEventUpdated {
    pub event_id: i64,
    pub user_id: i64,
    pub updated_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEventCancelled {
    pub event_id: i64,
    pub user_id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingScheduled {
    pub event_id: i64,
    pub organizer_id: i64,
    pub participants: Vec<i64>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub team_id: Option<i64>,
    pub org_unit_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingParticipantInvited {
    pub event_id: i64,
    pub participant_id: i64,
    pub organizer_id: i64,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityChanged {
    pub user_id: i64,
    pub work_start_time: String,
    pub work_end_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::routing_keys;

    #[test]
    fn envelope_flattens_payload_fields() {
        let payload = TeamDeactivated { team_id: 2 };
        let envelope = EventEnvelope::new(routing_keys::TEAM_DEACTIVATED, &payload).unwrap();

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event_type"], "team.deactivated");
        assert_eq!(json["team_id"], 2);
    }

    #[test]
    fn envelope_round_trips_typed_payload() {
        let payload = TaskStatusChanged {
            task_id: 7,
            status: "cancelled".to_string(),
            assignee_id: Some(5),
            team_id: Some(2),
        };
        let envelope =
            EventEnvelope::new(routing_keys::TASK_STATUS_CHANGED, &payload).unwrap();
        let bytes = serde_json::to_vec(&envelope).unwrap();

        let decoded: EventEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.event_type, "task.status_changed");
        let back: TaskStatusChanged = decoded.payload().unwrap();
        assert_eq!(back.task_id, 7);
        assert_eq!(back.status, "cancelled");
        assert_eq!(back.assignee_id, Some(5));
    }

    #[test]
    fn calendar_event_created_round_trips_with_single_event_type_key() {
        let payload = CalendarEventCreated {
            event_id: 3,
            user_id: 9,
            title: "standup".to_string(),
            start_at: Utc::now(),
            end_at: Utc::now(),
            kind: "meeting".to_string(),
        };
        let envelope =
            EventEnvelope::new(routing_keys::CALENDAR_EVENT_CREATED, &payload).unwrap();
        let bytes = serde_json::to_vec(&envelope).unwrap();

        let raw = String::from_utf8(bytes.clone()).unwrap();
        assert_eq!(raw.matches("\"event_type\"").count(), 1);

        let decoded: EventEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.event_type, "calendar_event.created");
        let back: CalendarEventCreated = decoded.payload().unwrap();
        assert_eq!(back.kind, "meeting");
    }

    #[test]
    fn colliding_payload_key_is_dropped_in_favor_of_routing_key() {
        let mut payload = Map::new();
        payload.insert("event_type".to_string(), Value::from("bogus"));
        payload.insert("user_id".to_string(), Value::from(4));

        let envelope = EventEnvelope::new(routing_keys::USER_STATUS_CHANGED, &payload).unwrap();
        let bytes = serde_json::to_vec(&envelope).unwrap();

        let decoded: EventEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.event_type, "user.status_changed");
        assert_eq!(decoded.payload.get("user_id"), Some(&Value::from(4)));
    }

    #[test]
    fn decoding_ignores_unknown_fields() {
        let raw = r#"{"event_type":"team.deactivated","team_id":2,"reason":"merger"}"#;
        let envelope: EventEnvelope = serde_json::from_str(raw).unwrap();
        let payload: TeamDeactivated = envelope.payload().unwrap();
        assert_eq!(payload.team_id, 2);
    }
}
