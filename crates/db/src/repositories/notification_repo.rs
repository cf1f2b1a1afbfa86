//! Repository for the `notification` table.

use issuehub_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::notification::{NewNotification, Notification};
use crate::BATCH_SIZE;

/// Column list for `notification` queries.
const COLUMNS: &str = "id, workspace_id, project_id, receiver_id, triggered_by_id, \
    entity_identifier, entity_name, sender, title, message, data, \
    read_at, snoozed_till, archived_at, created_at";

pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert notifications in batches. Returns the number inserted.
    pub async fn bulk_create(
        conn: &mut PgConnection,
        rows: &[NewNotification],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for chunk in rows.chunks(BATCH_SIZE) {
            let workspace_ids: Vec<DbId> = chunk.iter().map(|n| n.workspace_id).collect();
            let project_ids: Vec<DbId> = chunk.iter().map(|n| n.project_id).collect();
            let receiver_ids: Vec<DbId> = chunk.iter().map(|n| n.receiver_id).collect();
            let triggered_by: Vec<DbId> = chunk.iter().map(|n| n.triggered_by_id).collect();
            let entity_ids: Vec<DbId> = chunk.iter().map(|n| n.entity_identifier).collect();
            let entity_names: Vec<String> = chunk.iter().map(|n| n.entity_name.clone()).collect();
            let senders: Vec<String> = chunk.iter().map(|n| n.sender.clone()).collect();
            let titles: Vec<Option<String>> = chunk.iter().map(|n| n.title.clone()).collect();
            let messages: Vec<Option<String>> = chunk.iter().map(|n| n.message.clone()).collect();
            let data = chunk
                .iter()
                .map(|n| serde_json::to_value(&n.data))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

            let result = sqlx::query(
                "INSERT INTO notification \
                    (workspace_id, project_id, receiver_id, triggered_by_id, entity_identifier, \
                     entity_name, sender, title, message, data) \
                 SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::bigint[], $4::bigint[], \
                     $5::bigint[], $6::text[], $7::text[], $8::text[], $9::text[], $10::jsonb[])",
            )
            .bind(&workspace_ids)
            .bind(&project_ids)
            .bind(&receiver_ids)
            .bind(&triggered_by)
            .bind(&entity_ids)
            .bind(&entity_names)
            .bind(&senders)
            .bind(&titles)
            .bind(&messages)
            .bind(&data)
            .execute(&mut *conn)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// Notifications received by a user, newest first.
    pub async fn list_for_receiver(
        pool: &PgPool,
        receiver_id: DbId,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification \
             WHERE receiver_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(receiver_id)
            .fetch_all(pool)
            .await
    }

    /// Notifications about an entity, oldest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_identifier: DbId,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification \
             WHERE entity_identifier = $1 \
             ORDER BY id"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(entity_identifier)
            .fetch_all(pool)
            .await
    }
}
