//! Repository for the `user_notification_preference` table.

use std::collections::HashMap;

use issuehub_core::preferences::NotificationPreference;
use issuehub_core::types::DbId;
use sqlx::PgPool;

use crate::models::preference::ResolvedPreference;

pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// Effective email preferences for `user_ids` within a project.
    ///
    /// For each user the project-scoped row wins over the workspace-scoped row,
    /// which wins over the unscoped row. Users with no row get the defaults.
    pub async fn resolve_for_users(
        pool: &PgPool,
        user_ids: &[DbId],
        workspace_id: DbId,
        project_id: DbId,
    ) -> Result<HashMap<DbId, NotificationPreference>, sqlx::Error> {
        let mut resolved: HashMap<DbId, NotificationPreference> = user_ids
            .iter()
            .map(|id| (*id, NotificationPreference::default()))
            .collect();
        if user_ids.is_empty() {
            return Ok(resolved);
        }

        let rows = sqlx::query_as::<_, ResolvedPreference>(
            "SELECT DISTINCT ON (user_id) \
                user_id, property_change, state_change, comment, mention, issue_completed \
             FROM user_notification_preference \
             WHERE user_id = ANY($1) \
               AND (project_id = $3 \
                    OR (project_id IS NULL AND (workspace_id = $2 OR workspace_id IS NULL))) \
             ORDER BY user_id, (project_id IS NULL), (workspace_id IS NULL)",
        )
        .bind(user_ids)
        .bind(workspace_id)
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        for row in rows {
            resolved.insert(row.user_id, row.into());
        }
        Ok(resolved)
    }
}
