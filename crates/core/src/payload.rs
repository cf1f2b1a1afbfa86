//! Typed JSON payloads stored on notifications and email log rows.

use serde::{Deserialize, Serialize};

use crate::activity::ActivityRecord;
use crate::types::{DbId, Timestamp};

/// The issue as it looked when the notification was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSnapshot {
    pub id: DbId,
    pub name: String,
    /// Project identifier, e.g. `WEB`.
    pub identifier: String,
    pub sequence_id: i32,
    pub state_name: Option<String>,
    pub state_group: Option<String>,
    pub project_id: DbId,
    pub workspace_slug: String,
}

/// The activity a notification reports on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub id: DbId,
    pub verb: String,
    pub field: Option<String>,
    pub actor: DbId,
    pub new_value: Option<String>,
    pub old_value: Option<String>,
    /// Stripped body of the referenced issue comment, if any.
    #[serde(default)]
    pub issue_comment: Option<String>,
    pub activity_time: Timestamp,
}

impl ActivitySnapshot {
    pub fn from_record(record: &ActivityRecord) -> Self {
        Self {
            id: record.id,
            verb: record.verb.clone(),
            field: record.field.clone(),
            actor: record.actor_id,
            new_value: record.new_value.clone(),
            old_value: record.old_value.clone(),
            issue_comment: None,
            activity_time: record.created_at,
        }
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn with_issue_comment(mut self, comment: Option<String>) -> Self {
        self.issue_comment = comment;
        self
    }
}

/// Payload stored in `notification.data` and `email_notification_log.data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub issue: IssueSnapshot,
    pub issue_activity: ActivitySnapshot,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn serialises_with_nested_keys() {
        let payload = NotificationPayload {
            issue: IssueSnapshot {
                id: 42,
                name: "Crash on save".into(),
                identifier: "WEB".into(),
                sequence_id: 7,
                state_name: Some("Todo".into()),
                state_group: Some("unstarted".into()),
                project_id: 3,
                workspace_slug: "acme".into(),
            },
            issue_activity: ActivitySnapshot {
                id: 100,
                verb: "updated".into(),
                field: Some("priority".into()),
                actor: 5,
                new_value: Some("high".into()),
                old_value: None,
                issue_comment: None,
                activity_time: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            },
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["issue"]["identifier"], "WEB");
        assert_eq!(value["issue_activity"]["field"], "priority");
        let back: NotificationPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn with_field_overrides_activity_field() {
        let snapshot = ActivitySnapshot {
            id: 1,
            verb: "created".into(),
            field: Some("comment".into()),
            actor: 2,
            new_value: None,
            old_value: None,
            issue_comment: None,
            activity_time: chrono::Utc::now(),
        }
        .with_field("mention");
        assert_eq!(snapshot.field.as_deref(), Some("mention"));
    }
}
