//! Read-only queries against `issue` and its satellite tables.

use issuehub_core::activity::STATE_GROUP_COMPLETED;
use issuehub_core::types::DbId;
use sqlx::PgPool;

use crate::models::activity::IssueActivity;
use crate::models::issue::{IssueCommentBody, IssueDetail};

/// Column list for `issue_activity` queries.
const ACTIVITY_COLUMNS: &str = "id, issue_id, actor_id, verb, field, old_value, new_value, \
    comment, issue_comment_id, old_identifier, new_identifier, created_at";

pub struct IssueRepo;

impl IssueRepo {
    /// Find an issue with its project, workspace and state.
    pub async fn find_detail(
        pool: &PgPool,
        issue_id: DbId,
    ) -> Result<Option<IssueDetail>, sqlx::Error> {
        sqlx::query_as::<_, IssueDetail>(
            "SELECT i.id, i.name, i.sequence_id, \
                    w.id AS workspace_id, w.slug AS workspace_slug, \
                    p.id AS project_id, \
                    p.identifier AS project_identifier, \
                    s.id AS state_id, s.name AS state_name, s.state_group, \
                    i.created_by \
             FROM issue i \
             JOIN project p ON p.id = i.project_id \
             JOIN workspace w ON w.id = p.workspace_id \
             LEFT JOIN state s ON s.id = i.state_id \
             WHERE i.id = $1",
        )
        .bind(issue_id)
        .fetch_optional(pool)
        .await
    }

    /// User ids assigned to the issue.
    pub async fn assignee_ids(pool: &PgPool, issue_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT assignee_id FROM issue_assignee WHERE issue_id = $1 ORDER BY assignee_id",
        )
        .bind(issue_id)
        .fetch_all(pool)
        .await
    }

    /// The most recently recorded activity on the issue, if any.
    pub async fn latest_activity(
        pool: &PgPool,
        issue_id: DbId,
    ) -> Result<Option<IssueActivity>, sqlx::Error> {
        let query = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM issue_activity \
             WHERE issue_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, IssueActivity>(&query)
            .bind(issue_id)
            .fetch_optional(pool)
            .await
    }

    /// The subset of `state_ids` that belong to the project's `completed` group.
    pub async fn completed_state_ids(
        pool: &PgPool,
        project_id: DbId,
        state_ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        if state_ids.is_empty() {
            return Ok(vec![]);
        }
        sqlx::query_scalar(
            "SELECT id FROM state \
             WHERE project_id = $1 AND id = ANY($2) AND state_group = $3",
        )
        .bind(project_id)
        .bind(state_ids)
        .bind(STATE_GROUP_COMPLETED)
        .fetch_all(pool)
        .await
    }

    /// Plain-text bodies of the given comments on an issue.
    pub async fn comment_bodies(
        pool: &PgPool,
        issue_id: DbId,
        comment_ids: &[DbId],
    ) -> Result<Vec<IssueCommentBody>, sqlx::Error> {
        if comment_ids.is_empty() {
            return Ok(vec![]);
        }
        sqlx::query_as::<_, IssueCommentBody>(
            "SELECT id, comment_stripped FROM issue_comment \
             WHERE issue_id = $1 AND id = ANY($2)",
        )
        .bind(issue_id)
        .bind(comment_ids)
        .fetch_all(pool)
        .await
    }
}
