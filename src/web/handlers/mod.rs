//! Route handlers, one module per service binary.

pub mod calendar;
pub mod tasks;
pub mod teams;
pub mod users;
