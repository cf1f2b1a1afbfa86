//! Email stacking.
//!
//! [`EmailStacker`] runs as a background task. Each run claims every pending
//! email log row, groups the rows by receiver and then by issue, and enqueues
//! one [`Task::SendEmail`] per group so that a receiver gets a single email
//! per issue instead of one per change.

use std::collections::HashMap;
use std::time::Duration;

use issuehub_core::types::{DbId, Timestamp};
use issuehub_db::models::email_log::EmailNotificationLog;
use issuehub_db::repositories::EmailNotificationLogRepo;
use issuehub_db::DbPool;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::queue::{EmailJob, Task, TaskQueue};
use crate::store::StoreError;

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Distinct old and new values reported for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_values: Vec<String>,
    pub new_values: Vec<String>,
}

/// Everything one actor changed on an issue since the last email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorChanges {
    pub actor_id: DbId,
    /// Fields in first-seen order.
    pub fields: Vec<FieldChange>,
    /// Earliest activity time among the actor's changes.
    pub activity_time: Timestamp,
}

impl ActorChanges {
    pub fn field(&self, name: &str) -> Option<&FieldChange> {
        self.fields.iter().find(|f| f.field == name)
    }
}

/// Merge email log rows into per-actor, per-field change lists.
///
/// Actors are keyed by the row's `triggered_by_id`. Empty and missing values
/// are skipped, as are values already listed for that field.
pub fn create_payload(rows: &[&EmailNotificationLog]) -> Vec<ActorChanges> {
    let mut actors: Vec<ActorChanges> = Vec::new();

    for row in rows {
        let activity = &row.data.issue_activity;
        let idx = match actors.iter().position(|a| a.actor_id == row.triggered_by_id) {
            Some(idx) => idx,
            None => {
                actors.push(ActorChanges {
                    actor_id: row.triggered_by_id,
                    fields: Vec::new(),
                    activity_time: activity.activity_time,
                });
                actors.len() - 1
            }
        };
        let actor = &mut actors[idx];
        actor.activity_time = actor.activity_time.min(activity.activity_time);

        let field_name = activity.field.clone().unwrap_or_default();
        let change = match actor.fields.iter().position(|f| f.field == field_name) {
            Some(i) => &mut actor.fields[i],
            None => {
                actor.fields.push(FieldChange {
                    field: field_name,
                    old_values: Vec::new(),
                    new_values: Vec::new(),
                });
                let last = actor.fields.len() - 1;
                &mut actor.fields[last]
            }
        };
        push_distinct(&mut change.old_values, activity.old_value.as_deref());
        push_distinct(&mut change.new_values, activity.new_value.as_deref());
    }

    actors
}

fn push_distinct(values: &mut Vec<String>, value: Option<&str>) {
    match value {
        Some(v) if !v.is_empty() && !values.iter().any(|existing| existing == v) => {
            values.push(v.to_string());
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Pending rows for one (receiver, issue) pair.
#[derive(Debug)]
pub struct PendingEmail<'a> {
    pub receiver_id: DbId,
    pub issue_id: DbId,
    pub rows: Vec<&'a EmailNotificationLog>,
}

impl PendingEmail<'_> {
    pub fn ids(&self) -> Vec<DbId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    pub fn into_job(self) -> EmailJob {
        EmailJob {
            issue_id: self.issue_id,
            receiver_id: self.receiver_id,
            email_notification_ids: self.ids(),
            changes: create_payload(&self.rows),
        }
    }
}

/// Group rows by receiver, then by issue, both in first-seen order.
pub fn group_pending(rows: &[EmailNotificationLog]) -> Vec<PendingEmail<'_>> {
    let mut index: HashMap<(DbId, DbId), usize> = HashMap::new();
    let mut groups: Vec<PendingEmail<'_>> = Vec::new();
    for row in rows {
        let key = (row.receiver_id, row.entity_identifier);
        match index.get(&key) {
            Some(&idx) => groups[idx].rows.push(row),
            None => {
                index.insert(key, groups.len());
                groups.push(PendingEmail {
                    receiver_id: row.receiver_id,
                    issue_id: row.entity_identifier,
                    rows: vec![row],
                });
            }
        }
    }
    groups.sort_by_key(|g| g.receiver_id);
    groups
}

// ---------------------------------------------------------------------------
// EmailStacker
// ---------------------------------------------------------------------------

/// Default interval between stacking runs.
pub const DEFAULT_STACK_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Queue error: {0}")]
    Queue(#[from] StoreError),
}

/// Counts from one stacking run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackSummary {
    pub rows_claimed: u64,
    pub emails_enqueued: usize,
}

/// Background service that stacks pending email log rows.
pub struct EmailStacker<Q> {
    pool: DbPool,
    queue: Q,
    interval: Duration,
}

impl<Q: TaskQueue> EmailStacker<Q> {
    pub fn new(pool: DbPool, queue: Q, interval: Duration) -> Self {
        Self {
            pool,
            queue,
            interval,
        }
    }

    /// Run the stacking loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Email stacker cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.stack_pending().await {
                        tracing::error!(error = %e, "Failed to stack email notifications");
                    }
                }
            }
        }
    }

    /// One stacking pass.
    ///
    /// Rows are claimed atomically before grouping, so concurrent stackers
    /// never build overlapping groups. A group whose task cannot be enqueued
    /// is released and picked up by the next run.
    pub async fn stack_pending(&self) -> Result<StackSummary, StackError> {
        let rows = EmailNotificationLogRepo::claim_unprocessed(&self.pool).await?;
        if rows.is_empty() {
            return Ok(StackSummary::default());
        }

        let mut released: Vec<DbId> = Vec::new();
        let mut emails_enqueued = 0;

        for group in group_pending(&rows) {
            let (receiver_id, issue_id) = (group.receiver_id, group.issue_id);
            let ids = group.ids();
            match self.queue.enqueue(Task::SendEmail(group.into_job())).await {
                Ok(()) => emails_enqueued += 1,
                Err(e) => {
                    tracing::error!(receiver_id, issue_id, error = %e, "Failed to enqueue stacked email");
                    released.extend(ids);
                }
            }
        }

        if !released.is_empty() {
            EmailNotificationLogRepo::release_claim(&self.pool, &released).await?;
        }
        let rows_claimed = (rows.len() - released.len()) as u64;
        tracing::info!(rows_claimed, emails_enqueued, released = released.len(), "Stacked email notifications");

        Ok(StackSummary {
            rows_claimed,
            emails_enqueued,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use issuehub_core::payload::{ActivitySnapshot, IssueSnapshot, NotificationPayload};
    use sqlx::types::Json;

    use super::*;

    fn row(
        id: DbId,
        receiver: DbId,
        issue: DbId,
        actor: DbId,
        field: &str,
        old: Option<&str>,
        new: Option<&str>,
        minute: u32,
    ) -> EmailNotificationLog {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap();
        EmailNotificationLog {
            id,
            receiver_id: receiver,
            triggered_by_id: actor,
            entity_identifier: issue,
            entity_name: "issue".into(),
            data: Json(NotificationPayload {
                issue: IssueSnapshot {
                    id: issue,
                    name: "Crash".into(),
                    identifier: "WEB".into(),
                    sequence_id: 1,
                    state_name: None,
                    state_group: None,
                    project_id: 1,
                    workspace_slug: "acme".into(),
                },
                issue_activity: ActivitySnapshot {
                    id,
                    verb: "updated".into(),
                    field: Some(field.into()),
                    actor,
                    new_value: new.map(Into::into),
                    old_value: old.map(Into::into),
                    issue_comment: None,
                    activity_time: at,
                },
            }),
            processed_at: None,
            sent_at: None,
            created_at: at,
        }
    }

    #[test]
    fn groups_by_receiver_then_issue() {
        let rows = vec![
            row(1, 9, 42, 5, "priority", None, Some("high"), 0),
            row(2, 9, 43, 5, "priority", None, Some("low"), 1),
            row(3, 9, 42, 6, "state", Some("Todo"), Some("Done"), 2),
            row(4, 3, 42, 5, "priority", None, Some("high"), 3),
        ];
        let groups = group_pending(&rows);
        let keys: Vec<(DbId, DbId, Vec<DbId>)> = groups
            .iter()
            .map(|g| (g.receiver_id, g.issue_id, g.ids()))
            .collect();
        assert_eq!(
            keys,
            vec![(3, 42, vec![4]), (9, 42, vec![1, 3]), (9, 43, vec![2])]
        );
    }

    #[test]
    fn payload_merges_values_per_actor_and_field() {
        let rows = vec![
            row(1, 9, 42, 5, "priority", Some("low"), Some("high"), 5),
            row(2, 9, 42, 5, "priority", Some("high"), Some("urgent"), 3),
            row(3, 9, 42, 5, "priority", Some("low"), Some("high"), 7),
            row(4, 9, 42, 6, "labels", None, Some(""), 1),
            row(5, 9, 42, 5, "state", None, Some("Done"), 9),
        ];
        let refs: Vec<&EmailNotificationLog> = rows.iter().collect();
        let payload = create_payload(&refs);

        assert_eq!(payload.len(), 2);
        let first = &payload[0];
        assert_eq!(first.actor_id, 5);
        assert_eq!(
            first.activity_time,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 3, 0).unwrap(),
            "earliest activity time wins"
        );
        let priority = first.field("priority").unwrap();
        assert_eq!(priority.old_values, vec!["low", "high"]);
        assert_eq!(priority.new_values, vec!["high", "urgent"]);
        assert_eq!(first.fields[1].field, "state");
        assert!(first.field("state").unwrap().old_values.is_empty());

        let labels = payload[1].field("labels").unwrap();
        assert!(labels.old_values.is_empty() && labels.new_values.is_empty());
    }

    #[test]
    fn into_job_covers_every_row_of_the_group() {
        let rows = vec![
            row(11, 9, 42, 5, "priority", None, Some("high"), 0),
            row(12, 9, 42, 5, "priority", None, Some("low"), 1),
        ];
        let job = group_pending(&rows).remove(0).into_job();
        assert_eq!(job.email_notification_ids, vec![11, 12]);
        assert_eq!(job.changes.len(), 1);
    }
}
