use issuehub_core::payload::IssueSnapshot;
use issuehub_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// An issue joined with its project, workspace and current state.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IssueDetail {
    pub id: DbId,
    pub name: String,
    pub sequence_id: i32,
    pub workspace_id: DbId,
    pub workspace_slug: String,
    pub project_id: DbId,
    pub project_identifier: String,
    pub state_id: Option<DbId>,
    pub state_name: Option<String>,
    pub state_group: Option<String>,
    pub created_by: Option<DbId>,
}

impl IssueDetail {
    /// `{project identifier}-{sequence id}`, e.g. `WEB-12`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.project_identifier, self.sequence_id)
    }

    pub fn snapshot(&self) -> IssueSnapshot {
        IssueSnapshot {
            id: self.id,
            name: self.name.clone(),
            identifier: self.project_identifier.clone(),
            sequence_id: self.sequence_id,
            state_name: self.state_name.clone(),
            state_group: self.state_group.clone(),
            project_id: self.project_id,
            workspace_slug: self.workspace_slug.clone(),
        }
    }
}

/// Plain-text body of an issue comment.
#[derive(Debug, Clone, FromRow)]
pub struct IssueCommentBody {
    pub id: DbId,
    pub comment_stripped: String,
}
