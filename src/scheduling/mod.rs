//! # Scheduling
//!
//! Conflict detection and meeting validation for the calendar service.
//!
//! All interval logic is half-open: an event occupies `[start, end)`, so a
//! meeting ending at 10:00 never conflicts with one starting at 10:00.

pub mod availability;

pub use availability::{
    check_organizer_permissions, create_meeting_with_validation, suggest_alternative_times,
    validate_participants_availability, ConflictReason, MeetingOutcome, MeetingRequest,
    SuggestedSlot, UserConflict, ValidationReport,
};

use chrono::{DateTime, Timelike, Utc};

/// Hour offsets tried, in order, when proposing alternative start times.
pub const SUGGESTION_OFFSETS: [i32; 3] = [1, -1, 2];

/// Maximum number of alternatives returned per validation.
pub const MAX_SUGGESTIONS: usize = 3;

/// Half-open interval overlap: `[s1, e1)` and `[s2, e2)` intersect.
pub fn intervals_overlap(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// Whether `[start, end)` falls inside the `HH:MM` working window.
/// Times of day are compared lexically, which is correct for zero-padded
/// `HH:MM` strings.
pub fn within_work_hours(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    work_start: &str,
    work_end: &str,
) -> bool {
    let start_hm = format!("{:02}:{:02}", start.hour(), start.minute());
    let end_hm = format!("{:02}:{:02}", end.hour(), end.minute());
    start_hm.as_str() >= work_start && end_hm.as_str() <= work_end
}

/// Shift a start time by whole hours via hour replacement. Returns `None`
/// when the shifted hour leaves the same day (outside `0..=23`); minutes
/// and seconds are preserved.
pub fn shifted_start(start: DateTime<Utc>, offset_hours: i32) -> Option<DateTime<Utc>> {
    let hour = start.hour() as i32 + offset_hours;
    if !(0..=23).contains(&hour) {
        return None;
    }
    start.with_hour(hour as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
    }

    #[test]
    fn overlapping_intervals_conflict() {
        assert!(intervals_overlap(at(10, 0), at(11, 0), at(10, 30), at(11, 30)));
        assert!(intervals_overlap(at(10, 0), at(12, 0), at(10, 30), at(11, 0)));
    }

    #[test]
    fn touching_intervals_do_not_conflict() {
        assert!(!intervals_overlap(at(9, 0), at(10, 0), at(10, 0), at(11, 0)));
        assert!(!intervals_overlap(at(10, 0), at(11, 0), at(9, 0), at(10, 0)));
    }

    #[test]
    fn disjoint_intervals_do_not_conflict() {
        assert!(!intervals_overlap(at(9, 0), at(10, 0), at(14, 0), at(15, 0)));
    }

    #[test]
    fn work_hours_are_inclusive_bounds() {
        assert!(within_work_hours(at(9, 0), at(18, 0), "09:00", "18:00"));
        assert!(within_work_hours(at(10, 30), at(11, 30), "09:00", "18:00"));
        assert!(!within_work_hours(at(8, 59), at(10, 0), "09:00", "18:00"));
        assert!(!within_work_hours(at(17, 30), at(18, 1), "09:00", "18:00"));
    }

    #[test]
    fn shifted_start_replaces_hour_and_clamps_to_day() {
        assert_eq!(shifted_start(at(10, 15), 1), Some(at(11, 15)));
        assert_eq!(shifted_start(at(10, 15), -1), Some(at(9, 15)));
        assert_eq!(shifted_start(at(23, 0), 1), None);
        assert_eq!(shifted_start(at(0, 0), -1), None);
    }
}
