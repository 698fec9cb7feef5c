//! Property tests for the conflict-detection primitives.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use teamflow::scheduling::{intervals_overlap, shifted_start, within_work_hours};

fn minute_of_day(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

proptest! {
    /// Overlap is symmetric in its two intervals.
    #[test]
    fn overlap_is_symmetric(
        s1 in 0i64..1_380, d1 in 1i64..60,
        s2 in 0i64..1_380, d2 in 1i64..60,
    ) {
        let (a1, b1) = (minute_of_day(s1), minute_of_day(s1 + d1));
        let (a2, b2) = (minute_of_day(s2), minute_of_day(s2 + d2));
        prop_assert_eq!(
            intervals_overlap(a1, b1, a2, b2),
            intervals_overlap(a2, b2, a1, b1)
        );
    }

    /// The half-open definition agrees with an exhaustive minute-by-minute
    /// membership check.
    #[test]
    fn overlap_matches_pointwise_membership(
        s1 in 0i64..200, d1 in 1i64..30,
        s2 in 0i64..200, d2 in 1i64..30,
    ) {
        let expected = (s1..s1 + d1).any(|m| (s2..s2 + d2).contains(&m));
        let actual = intervals_overlap(
            minute_of_day(s1), minute_of_day(s1 + d1),
            minute_of_day(s2), minute_of_day(s2 + d2),
        );
        prop_assert_eq!(actual, expected);
    }

    /// Back-to-back intervals never conflict.
    #[test]
    fn touching_boundaries_never_conflict(s in 0i64..1_300, d in 1i64..60, e in 1i64..60) {
        let first_end = s + d;
        prop_assert!(!intervals_overlap(
            minute_of_day(s), minute_of_day(first_end),
            minute_of_day(first_end), minute_of_day(first_end + e),
        ));
    }

    /// An interval always conflicts with itself.
    #[test]
    fn interval_conflicts_with_itself(s in 0i64..1_380, d in 1i64..60) {
        let (a, b) = (minute_of_day(s), minute_of_day(s + d));
        prop_assert!(intervals_overlap(a, b, a, b));
    }

    /// Shifting by a valid offset preserves minutes and changes only the hour.
    #[test]
    fn shifted_start_preserves_minutes(hour in 0u32..24, minute in 0u32..60, offset in -2i32..=2) {
        use chrono::Timelike;
        let start = Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap();
        match shifted_start(start, offset) {
            Some(shifted) => {
                prop_assert_eq!(shifted.minute(), minute);
                prop_assert_eq!(shifted.hour() as i32, hour as i32 + offset);
            }
            None => {
                let target = hour as i32 + offset;
                prop_assert!(!(0..=23).contains(&target));
            }
        }
    }
}

#[test]
fn work_hours_respect_custom_windows() {
    let at = |h, m| Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap();
    assert!(within_work_hours(at(7, 0), at(8, 0), "06:30", "15:00"));
    assert!(!within_work_hours(at(7, 0), at(8, 0), "09:00", "18:00"));
    assert!(!within_work_hours(at(14, 30), at(15, 30), "06:30", "15:00"));
}
