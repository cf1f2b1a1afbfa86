//! Repository for the `issue_subscriber` table.

use issuehub_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::subscriber::NewIssueSubscriber;
use crate::BATCH_SIZE;

pub struct IssueSubscriberRepo;

impl IssueSubscriberRepo {
    /// Subscriber user ids for an issue.
    pub async fn subscriber_ids(pool: &PgPool, issue_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT subscriber_id FROM issue_subscriber WHERE issue_id = $1 ORDER BY id",
        )
        .bind(issue_id)
        .fetch_all(pool)
        .await
    }

    /// Insert subscriptions in batches, ignoring pairs that already exist.
    ///
    /// Returns the number of rows actually inserted.
    pub async fn bulk_insert(
        conn: &mut PgConnection,
        rows: &[NewIssueSubscriber],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for chunk in rows.chunks(BATCH_SIZE) {
            let workspace_ids: Vec<DbId> = chunk.iter().map(|r| r.workspace_id).collect();
            let project_ids: Vec<DbId> = chunk.iter().map(|r| r.project_id).collect();
            let issue_ids: Vec<DbId> = chunk.iter().map(|r| r.issue_id).collect();
            let subscriber_ids: Vec<DbId> = chunk.iter().map(|r| r.subscriber_id).collect();
            let created_by: Vec<DbId> = chunk.iter().map(|r| r.created_by).collect();

            let result = sqlx::query(
                "INSERT INTO issue_subscriber \
                    (workspace_id, project_id, issue_id, subscriber_id, created_by) \
                 SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::bigint[], $4::bigint[], $5::bigint[]) \
                 ON CONFLICT (issue_id, subscriber_id) DO NOTHING",
            )
            .bind(&workspace_ids)
            .bind(&project_ids)
            .bind(&issue_ids)
            .bind(&subscriber_ids)
            .bind(&created_by)
            .execute(&mut *conn)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// Get-or-create a single subscription.
    ///
    /// Returns `true` when a new row was created.
    pub async fn ensure_subscribed(
        conn: &mut PgConnection,
        row: &NewIssueSubscriber,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO issue_subscriber \
                (workspace_id, project_id, issue_id, subscriber_id, created_by) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (issue_id, subscriber_id) DO NOTHING",
        )
        .bind(row.workspace_id)
        .bind(row.project_id)
        .bind(row.issue_id)
        .bind(row.subscriber_id)
        .bind(row.created_by)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
