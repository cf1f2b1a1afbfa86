//! Issue activity events as handed to the notification pipeline.
//!
//! An [`IssueActivityEvent`] describes one logical mutation: the activity rows
//! it produced plus the old and new JSON snapshots of the issue, which are
//! needed for description mention diffing.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_STATE: &str = "state";
pub const FIELD_COMMENT: &str = "comment";

/// Synthetic field used on email payloads produced for mentions.
pub const FIELD_MENTION: &str = "mention";

/// State group that counts as "issue completed" for preference gating.
pub const STATE_GROUP_COMPLETED: &str = "completed";

/// Event types that never go through mention/subscriber fan-out.
pub const EXCLUDED_EVENT_TYPES: &[&str] = &[
    "issue.activity.deleted",
    "cycle.activity.created",
    "cycle.activity.deleted",
    "module.activity.created",
    "module.activity.deleted",
    "issue_reaction.activity.created",
    "issue_reaction.activity.deleted",
    "comment_reaction.activity.created",
    "comment_reaction.activity.deleted",
    "issue_vote.activity.created",
    "issue_vote.activity.deleted",
    "issue_draft.activity.created",
    "issue_draft.activity.updated",
    "issue_draft.activity.deleted",
];

/// Whether an event of this type is processed by the fan-out builder.
pub fn is_fanout_eligible(event_type: &str) -> bool {
    !EXCLUDED_EVENT_TYPES.contains(&event_type)
}

// ---------------------------------------------------------------------------
// Activity record
// ---------------------------------------------------------------------------

/// One field-level change recorded for an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: DbId,
    /// Issue the activity was recorded on. Relation activities (blocking,
    /// duplicates) may carry a different issue than the event.
    pub issue_id: Option<DbId>,
    pub actor_id: DbId,
    pub verb: String,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// Human-readable summary, used as the notification title.
    #[serde(default)]
    pub comment: String,
    pub issue_comment_id: Option<DbId>,
    pub old_identifier: Option<DbId>,
    pub new_identifier: Option<DbId>,
    pub created_at: Timestamp,
}

impl ActivityRecord {
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn is_description(&self) -> bool {
        self.field() == Some(FIELD_DESCRIPTION)
    }

    /// Whether the activity targets `issue_id`. Activities without an issue
    /// reference belong to the event's issue.
    pub fn belongs_to(&self, issue_id: DbId) -> bool {
        self.issue_id.is_none_or(|id| id == issue_id)
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// An activity batch produced by a single issue mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct IssueActivityEvent {
    #[validate(length(min = 1, max = 128))]
    pub event_type: String,
    #[validate(range(min = 1))]
    pub issue_id: DbId,
    #[validate(range(min = 1))]
    pub project_id: DbId,
    #[validate(range(min = 1))]
    pub actor_id: DbId,
    /// Subscribe the actor to the issue as part of processing.
    #[serde(default)]
    pub subscribe_actor: bool,
    #[serde(default)]
    pub activities: Vec<ActivityRecord>,
    /// New issue snapshot (JSON).
    pub requested_data: Option<String>,
    /// Issue snapshot before the mutation (JSON).
    pub current_instance: Option<String>,
}

impl IssueActivityEvent {
    /// Decode and validate an event from its JSON form.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let event: Self = serde_json::from_str(raw)?;
        event.ensure_valid()?;
        Ok(event)
    }

    pub fn ensure_valid(&self) -> Result<(), CoreError> {
        self.validate()?;
        Ok(())
    }

    pub fn is_fanout_eligible(&self) -> bool {
        is_fanout_eligible(&self.event_type)
    }

    /// Activities that reference an issue comment.
    pub fn comment_activities(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.activities
            .iter()
            .filter(|a| a.issue_comment_id.is_some())
    }
}
