//! Repository for the `issue_mention` table.

use issuehub_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::subscriber::NewIssueMention;
use crate::BATCH_SIZE;

pub struct IssueMentionRepo;

impl IssueMentionRepo {
    /// Mentioned user ids recorded for an issue.
    pub async fn mention_ids(pool: &PgPool, issue_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT mention_id FROM issue_mention WHERE issue_id = $1 ORDER BY id")
            .bind(issue_id)
            .fetch_all(pool)
            .await
    }

    /// Record new mentions, ignoring ones already recorded.
    pub async fn bulk_insert(
        conn: &mut PgConnection,
        rows: &[NewIssueMention],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for chunk in rows.chunks(BATCH_SIZE) {
            let workspace_ids: Vec<DbId> = chunk.iter().map(|r| r.workspace_id).collect();
            let project_ids: Vec<DbId> = chunk.iter().map(|r| r.project_id).collect();
            let issue_ids: Vec<DbId> = chunk.iter().map(|r| r.issue_id).collect();
            let mention_ids: Vec<DbId> = chunk.iter().map(|r| r.mention_id).collect();
            let created_by: Vec<DbId> = chunk.iter().map(|r| r.created_by).collect();

            let result = sqlx::query(
                "INSERT INTO issue_mention \
                    (workspace_id, project_id, issue_id, mention_id, created_by) \
                 SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::bigint[], $4::bigint[], $5::bigint[]) \
                 ON CONFLICT (issue_id, mention_id) DO NOTHING",
            )
            .bind(&workspace_ids)
            .bind(&project_ids)
            .bind(&issue_ids)
            .bind(&mention_ids)
            .bind(&created_by)
            .execute(&mut *conn)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// Delete the mentions of `user_ids` on an issue.
    pub async fn delete_for_users(
        conn: &mut PgConnection,
        issue_id: DbId,
        user_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let result =
            sqlx::query("DELETE FROM issue_mention WHERE issue_id = $1 AND mention_id = ANY($2)")
                .bind(issue_id)
                .bind(user_ids)
                .execute(conn)
                .await?;
        Ok(result.rows_affected())
    }
}
