use issuehub_core::payload::NotificationPayload;
use issuehub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `email_notification_log` table.
///
/// Lifecycle: unprocessed, then claimed by the stacker (`processed_at`), then
/// delivered (`sent_at`).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmailNotificationLog {
    pub id: DbId,
    pub receiver_id: DbId,
    pub triggered_by_id: DbId,
    pub entity_identifier: DbId,
    pub entity_name: String,
    pub data: Json<NotificationPayload>,
    pub processed_at: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Pending email log row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmailNotificationLog {
    pub receiver_id: DbId,
    pub triggered_by_id: DbId,
    pub entity_identifier: DbId,
    pub entity_name: String,
    pub data: NotificationPayload,
}
