use issuehub_core::payload::NotificationPayload;
use issuehub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `notification` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub workspace_id: DbId,
    pub project_id: Option<DbId>,
    pub receiver_id: DbId,
    pub triggered_by_id: Option<DbId>,
    pub entity_identifier: DbId,
    pub entity_name: String,
    pub sender: String,
    pub title: Option<String>,
    pub message: Option<String>,
    pub data: Json<NotificationPayload>,
    pub read_at: Option<Timestamp>,
    pub snoozed_till: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Pending in-app notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub workspace_id: DbId,
    pub project_id: DbId,
    pub receiver_id: DbId,
    pub triggered_by_id: DbId,
    pub entity_identifier: DbId,
    pub entity_name: String,
    pub sender: String,
    pub title: Option<String>,
    pub message: Option<String>,
    pub data: NotificationPayload,
}
