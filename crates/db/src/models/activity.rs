use issuehub_core::activity::ActivityRecord;
use issuehub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `issue_activity` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IssueActivity {
    pub id: DbId,
    pub issue_id: Option<DbId>,
    pub actor_id: Option<DbId>,
    pub verb: String,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: String,
    pub issue_comment_id: Option<DbId>,
    pub old_identifier: Option<DbId>,
    pub new_identifier: Option<DbId>,
    pub created_at: Timestamp,
}

impl IssueActivity {
    /// Convert to the pipeline's activity record. Rows whose actor was
    /// deleted have no record.
    pub fn into_record(self) -> Option<ActivityRecord> {
        Some(ActivityRecord {
            id: self.id,
            issue_id: self.issue_id,
            actor_id: self.actor_id?,
            verb: self.verb,
            field: self.field,
            old_value: self.old_value,
            new_value: self.new_value,
            comment: self.comment,
            issue_comment_id: self.issue_comment_id,
            old_identifier: self.old_identifier,
            new_identifier: self.new_identifier,
            created_at: self.created_at,
        })
    }
}
