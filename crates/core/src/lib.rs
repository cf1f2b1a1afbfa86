pub mod activity;
pub mod diff;
pub mod error;
pub mod html;
pub mod mentions;
pub mod payload;
pub mod preferences;
pub mod senders;
pub mod subscribers;
pub mod types;
