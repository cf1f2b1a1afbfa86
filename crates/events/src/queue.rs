//! Background task envelopes and the queue abstraction.
//!
//! Tasks are serialised as JSON and pushed onto a shared list. Any worker
//! process may pop and execute them.

use chrono::Utc;
use issuehub_core::activity::IssueActivityEvent;
use issuehub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stacking::ActorChanges;
use crate::store::StoreError;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// One stacked email for a (receiver, issue) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailJob {
    pub issue_id: DbId,
    pub receiver_id: DbId,
    /// Per-actor merged changes, in first-seen actor order.
    pub changes: Vec<ActorChanges>,
    /// Email log rows this email satisfies.
    pub email_notification_ids: Vec<DbId>,
}

/// Work items executed by the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// Fan out an issue activity batch.
    IssueActivity(IssueActivityEvent),
    /// Compose and send one stacked email.
    SendEmail(EmailJob),
}

impl Task {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IssueActivity(_) => "issue_activity",
            Self::SendEmail(_) => "send_email",
        }
    }

    /// Queue this task is pushed to, given the base queue key.
    ///
    /// Email tasks live on their own list so that workers without a mail
    /// transport never pop them.
    pub fn queue_key(&self, base: &str) -> String {
        match self {
            Self::IssueActivity(_) => base.to_string(),
            Self::SendEmail(_) => email_queue_key(base),
        }
    }
}

/// Queue carrying [`Task::SendEmail`] for the base key `base`.
pub fn email_queue_key(base: &str) -> String {
    format!("{base}:email")
}

/// A task as stored on the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub id: Uuid,
    pub enqueued_at: Timestamp,
    pub task: Task,
}

impl TaskEnvelope {
    pub fn new(task: Task) -> Self {
        Self {
            id: Uuid::now_v7(),
            enqueued_at: Utc::now(),
            task,
        }
    }
}

// ---------------------------------------------------------------------------
// TaskQueue
// ---------------------------------------------------------------------------

/// Destination for background tasks.
pub trait TaskQueue: Send + Sync {
    /// Push a task for asynchronous execution.
    fn enqueue(&self, task: Task)
        -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
