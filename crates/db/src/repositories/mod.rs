//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query functions.

pub mod email_log_repo;
pub mod issue_mention_repo;
pub mod issue_repo;
pub mod issue_subscriber_repo;
pub mod notification_preference_repo;
pub mod notification_repo;
pub mod user_repo;

pub use email_log_repo::EmailNotificationLogRepo;
pub use issue_mention_repo::IssueMentionRepo;
pub use issue_repo::IssueRepo;
pub use issue_subscriber_repo::IssueSubscriberRepo;
pub use notification_preference_repo::NotificationPreferenceRepo;
pub use notification_repo::NotificationRepo;
pub use user_repo::UserRepo;
