//! Background worker for issue notifications.
//!
//! Hosts the task runner (fan-out and email delivery) and the periodic
//! email stacker in one process.

pub mod config;
pub mod roles;
