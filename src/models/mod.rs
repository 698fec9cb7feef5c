//! # Data Models
//!
//! One module per table, each owned by exactly one service binary. Records
//! derive `sqlx::FromRow` and queries run through runtime-checked
//! `sqlx::query_as`, so the crate builds without a live database.

pub mod calendar_event;
pub mod org_member;
pub mod org_unit;
pub mod task;
pub mod task_comment;
pub mod task_evaluation;
pub mod team;
pub mod user;
pub mod user_availability;
pub mod user_performance;

pub use calendar_event::{CalendarEvent, EventKind, EventStatus, NewCalendarEvent};
pub use org_member::{OrgMember, SubordinateNode};
pub use org_unit::OrgUnit;
pub use task::{NewTask, Task, TaskPriority, TaskStatus};
pub use task_comment::TaskComment;
pub use task_evaluation::TaskEvaluation;
pub use team::Team;
pub use user::{NewUser, User, UserRole, UserStatus};
pub use user_availability::{
    AvailabilityStatus, UserAvailability, DEFAULT_WORK_END, DEFAULT_WORK_START,
};
pub use user_performance::UserPerformance;
