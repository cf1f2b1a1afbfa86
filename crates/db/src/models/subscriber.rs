use issuehub_core::types::DbId;

/// Pending `issue_subscriber` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssueSubscriber {
    pub workspace_id: DbId,
    pub project_id: DbId,
    pub issue_id: DbId,
    pub subscriber_id: DbId,
    pub created_by: DbId,
}

/// Pending `issue_mention` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssueMention {
    pub workspace_id: DbId,
    pub project_id: DbId,
    pub issue_id: DbId,
    pub mention_id: DbId,
    pub created_by: DbId,
}
