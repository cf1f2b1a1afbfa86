use issuehub_core::preferences::NotificationPreference;
use issuehub_core::types::DbId;
use sqlx::FromRow;

/// The effective preference row chosen for a user.
#[derive(Debug, Clone, FromRow)]
pub struct ResolvedPreference {
    pub user_id: DbId,
    pub property_change: bool,
    pub state_change: bool,
    pub comment: bool,
    pub mention: bool,
    pub issue_completed: bool,
}

impl From<ResolvedPreference> for NotificationPreference {
    fn from(row: ResolvedPreference) -> Self {
        Self {
            property_change: row.property_change,
            state_change: row.state_change,
            comment: row.comment,
            mention: row.mention,
            issue_completed: row.issue_completed,
        }
    }
}
