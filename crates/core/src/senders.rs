//! Well-known notification sender tags and entity names.
//!
//! Sender tags are stored in the `notification.sender` column and tell the
//! client which inbox tab a notification belongs to. They follow the
//! `{channel}:{source}:{reason}` convention.

/// The recipient created the issue.
pub const SENDER_CREATED: &str = "in_app:issue_activities:created";

/// The recipient is assigned to the issue (and the creator is not).
pub const SENDER_ASSIGNED: &str = "in_app:issue_activities:assigned";

/// The recipient follows the issue without owning it.
pub const SENDER_SUBSCRIBED: &str = "in_app:issue_activities:subscribed";

/// The recipient was mentioned in the description or a comment.
pub const SENDER_MENTIONED: &str = "in_app:issue_activities:mentioned";

/// Value of `entity_name` for notifications and email logs about issues.
pub const ENTITY_ISSUE: &str = "issue";

/// Why a subscriber receives a generic (non-mention) notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberRole {
    Creator,
    Assignee,
    Subscriber,
}

impl SubscriberRole {
    /// Classify a recipient.
    ///
    /// Assignees only get the `assigned` tag while the creator is not also an
    /// assignee; otherwise they fall back to `subscribed`.
    pub fn classify(
        recipient: crate::types::DbId,
        creator: Option<crate::types::DbId>,
        is_assignee: impl Fn(crate::types::DbId) -> bool,
    ) -> Self {
        if creator == Some(recipient) {
            return Self::Creator;
        }
        let creator_assigned = creator.is_some_and(&is_assignee);
        if is_assignee(recipient) && !creator_assigned {
            Self::Assignee
        } else {
            Self::Subscriber
        }
    }

    /// The sender tag stored with the notification.
    pub fn sender(&self) -> &'static str {
        match self {
            Self::Creator => SENDER_CREATED,
            Self::Assignee => SENDER_ASSIGNED,
            Self::Subscriber => SENDER_SUBSCRIBED,
        }
    }
}
