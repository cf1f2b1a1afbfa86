//! Row structs and insert DTOs.
//!
//! Row structs derive `FromRow`; `New*` structs are inputs for bulk inserts.

pub mod activity;
pub mod email_log;
pub mod issue;
pub mod notification;
pub mod preference;
pub mod subscriber;
pub mod user;
