//! Repository for the `email_notification_log` table.

use issuehub_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::email_log::{EmailNotificationLog, NewEmailNotificationLog};
use crate::BATCH_SIZE;

/// Column list for `email_notification_log` queries.
const COLUMNS: &str = "id, receiver_id, triggered_by_id, entity_identifier, entity_name, \
    data, processed_at, sent_at, created_at";

pub struct EmailNotificationLogRepo;

impl EmailNotificationLogRepo {
    /// Insert email log rows in batches. Returns the number inserted.
    pub async fn bulk_create(
        conn: &mut PgConnection,
        rows: &[NewEmailNotificationLog],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for chunk in rows.chunks(BATCH_SIZE) {
            let receiver_ids: Vec<DbId> = chunk.iter().map(|r| r.receiver_id).collect();
            let triggered_by: Vec<DbId> = chunk.iter().map(|r| r.triggered_by_id).collect();
            let entity_ids: Vec<DbId> = chunk.iter().map(|r| r.entity_identifier).collect();
            let entity_names: Vec<String> = chunk.iter().map(|r| r.entity_name.clone()).collect();
            let data = chunk
                .iter()
                .map(|r| serde_json::to_value(&r.data))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

            let result = sqlx::query(
                "INSERT INTO email_notification_log \
                    (receiver_id, triggered_by_id, entity_identifier, entity_name, data) \
                 SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::bigint[], $4::text[], $5::jsonb[])",
            )
            .bind(&receiver_ids)
            .bind(&triggered_by)
            .bind(&entity_ids)
            .bind(&entity_names)
            .bind(&data)
            .execute(&mut *conn)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// Claim every unprocessed row in one statement and return the claimed
    /// rows ordered by receiver then id.
    ///
    /// Rows locked by a concurrent claim are skipped, so two stackers never
    /// return the same row.
    pub async fn claim_unprocessed(pool: &PgPool) -> Result<Vec<EmailNotificationLog>, sqlx::Error> {
        let query = format!(
            "UPDATE email_notification_log SET processed_at = NOW() \
             WHERE id IN ( \
                 SELECT id FROM email_notification_log \
                 WHERE processed_at IS NULL \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        let mut rows = sqlx::query_as::<_, EmailNotificationLog>(&query)
            .fetch_all(pool)
            .await?;
        rows.sort_by_key(|r| (r.receiver_id, r.id));
        Ok(rows)
    }

    /// Return claimed rows to the pending pool. Sent rows stay claimed.
    pub async fn release_claim(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE email_notification_log SET processed_at = NULL \
             WHERE id = ANY($1) AND sent_at IS NULL",
        )
        .bind(ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// The subset of `ids` that has not been sent yet.
    pub async fn unsent_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        sqlx::query_scalar(
            "SELECT id FROM email_notification_log \
             WHERE id = ANY($1) AND sent_at IS NULL \
             ORDER BY id",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Record delivery of the given rows.
    pub async fn mark_sent(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE email_notification_log SET sent_at = NOW() \
             WHERE id = ANY($1) AND sent_at IS NULL",
        )
        .bind(ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_ids(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<EmailNotificationLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_notification_log WHERE id = ANY($1) ORDER BY id"
        );
        sqlx::query_as::<_, EmailNotificationLog>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Rows addressed to a receiver, oldest first.
    pub async fn list_for_receiver(
        pool: &PgPool,
        receiver_id: DbId,
    ) -> Result<Vec<EmailNotificationLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_notification_log WHERE receiver_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, EmailNotificationLog>(&query)
            .bind(receiver_id)
            .fetch_all(pool)
            .await
    }
}
