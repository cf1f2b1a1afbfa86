//! Lock-guarded delivery of stacked emails.
//!
//! [`EmailDispatcher::send`] takes the delivery lock for the job's
//! (issue, receiver, row set), composes the email, hands it to the gateway
//! and marks the rows sent. A job whose lock is held elsewhere is dropped;
//! rows are never retried once the stacker has claimed them.

use std::collections::HashMap;
use std::time::Duration;

use issuehub_core::types::DbId;
use issuehub_db::models::issue::IssueDetail;
use issuehub_db::models::user::User;
use issuehub_db::repositories::{EmailNotificationLogRepo, IssueRepo, UserRepo};
use issuehub_db::DbPool;
use uuid::Uuid;

use crate::delivery::email::{EmailError, MailTransport};
use crate::lock::lock_key;
use crate::queue::EmailJob;
use crate::render::render_issue_email;
use crate::store::{KeyValueStore, StoreError};

/// Default lifetime of a delivery lock.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Error and outcome
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to send email to {to}: {source}")]
    Gateway { to: String, source: EmailError },
}

/// What happened to one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    /// Another attempt holds the lock for the same row set.
    LockContended,
    /// Every covered row already has `sent_at`.
    AlreadySent,
    /// The issue or receiver no longer exists.
    MissingEntity,
    Failed,
}

// ---------------------------------------------------------------------------
// DeliveryStore
// ---------------------------------------------------------------------------

/// Database reads and writes needed for delivery.
pub trait DeliveryStore: Send + Sync {
    fn issue(
        &self,
        issue_id: DbId,
    ) -> impl std::future::Future<Output = Result<Option<IssueDetail>, sqlx::Error>> + Send;

    fn users(
        &self,
        ids: &[DbId],
    ) -> impl std::future::Future<Output = Result<Vec<User>, sqlx::Error>> + Send;

    /// The subset of `ids` not yet sent.
    fn unsent(
        &self,
        ids: &[DbId],
    ) -> impl std::future::Future<Output = Result<Vec<DbId>, sqlx::Error>> + Send;

    fn mark_sent(
        &self,
        ids: &[DbId],
    ) -> impl std::future::Future<Output = Result<u64, sqlx::Error>> + Send;
}

/// [`DeliveryStore`] backed by the repositories.
pub struct PgDeliveryStore {
    pool: DbPool,
}

impl PgDeliveryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl DeliveryStore for PgDeliveryStore {
    async fn issue(&self, issue_id: DbId) -> Result<Option<IssueDetail>, sqlx::Error> {
        IssueRepo::find_detail(&self.pool, issue_id).await
    }

    async fn users(&self, ids: &[DbId]) -> Result<Vec<User>, sqlx::Error> {
        UserRepo::find_many(&self.pool, ids).await
    }

    async fn unsent(&self, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        EmailNotificationLogRepo::unsent_ids(&self.pool, ids).await
    }

    async fn mark_sent(&self, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        EmailNotificationLogRepo::mark_sent(&self.pool, ids).await
    }
}

// ---------------------------------------------------------------------------
// EmailDispatcher
// ---------------------------------------------------------------------------

pub struct EmailDispatcher<S, K, M> {
    store: S,
    kv: K,
    mailer: M,
    lock_ttl: Duration,
    default_base_url: String,
}

impl<S: DeliveryStore, K: KeyValueStore, M: MailTransport> EmailDispatcher<S, K, M> {
    pub fn new(store: S, kv: K, mailer: M, default_base_url: impl Into<String>) -> Self {
        Self {
            store,
            kv,
            mailer,
            lock_ttl: DEFAULT_LOCK_TTL,
            default_base_url: default_base_url.into(),
        }
    }

    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    /// Deliver one stacked email. Never fails; the outcome is returned for
    /// logging and tests.
    pub async fn send(&self, job: &EmailJob) -> DispatchOutcome {
        let key = lock_key(job.issue_id, job.receiver_id, &job.email_notification_ids);
        let token = Uuid::now_v7().to_string();

        match self.kv.set_nx(&key, &token, self.lock_ttl).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    issue_id = job.issue_id,
                    receiver_id = job.receiver_id,
                    email_notification_ids = ?job.email_notification_ids,
                    "Delivery lock held elsewhere, skipping"
                );
                return DispatchOutcome::LockContended;
            }
            Err(e) => {
                tracing::error!(issue_id = job.issue_id, receiver_id = job.receiver_id, error = %e, "Failed to acquire delivery lock");
                return DispatchOutcome::Failed;
            }
        }

        let outcome = match self.deliver(job).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    issue_id = job.issue_id,
                    receiver_id = job.receiver_id,
                    error = %e,
                    "Email delivery failed"
                );
                DispatchOutcome::Failed
            }
        };

        match self.kv.release(&key, &token).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(key = %key, "Delivery lock expired before release"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to release delivery lock"),
        }
        outcome
    }

    async fn deliver(&self, job: &EmailJob) -> Result<DispatchOutcome, DispatchError> {
        let Some(issue) = self.store.issue(job.issue_id).await? else {
            tracing::warn!(issue_id = job.issue_id, receiver_id = job.receiver_id, "Issue no longer exists");
            return Ok(DispatchOutcome::MissingEntity);
        };

        let unsent = self.store.unsent(&job.email_notification_ids).await?;
        if unsent.is_empty() {
            tracing::info!(issue_id = job.issue_id, receiver_id = job.receiver_id, "Email already sent");
            return Ok(DispatchOutcome::AlreadySent);
        }

        let users: HashMap<DbId, User> = self
            .store
            .users(&referenced_users(job))
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let Some(receiver) = users.get(&job.receiver_id) else {
            tracing::warn!(issue_id = job.issue_id, receiver_id = job.receiver_id, "Receiver no longer exists");
            return Ok(DispatchOutcome::MissingEntity);
        };

        let base_url = self.base_url(job.issue_id).await;
        let email = render_issue_email(&issue, &job.changes, &users, &base_url);

        self.mailer
            .send(&receiver.email, &email.subject, &email.html)
            .await
            .map_err(|source| DispatchError::Gateway {
                to: receiver.email.clone(),
                source,
            })?;

        let marked = self.store.mark_sent(&job.email_notification_ids).await?;
        tracing::info!(
            issue_id = job.issue_id,
            receiver_id = job.receiver_id,
            rows = marked,
            "Issue email delivered"
        );
        Ok(DispatchOutcome::Sent)
    }

    /// Web base URL cached per issue by the API, or the configured default.
    async fn base_url(&self, issue_id: DbId) -> String {
        match self.kv.get(&issue_id.to_string()).await {
            Ok(Some(url)) if !url.is_empty() => url,
            Ok(_) => self.default_base_url.clone(),
            Err(e) => {
                tracing::warn!(issue_id, error = %e, "Failed to read cached base URL");
                self.default_base_url.clone()
            }
        }
    }
}

/// Receiver, actors and users mentioned in comment or mention bodies.
fn referenced_users(job: &EmailJob) -> Vec<DbId> {
    let mut ids = vec![job.receiver_id];
    for actor in &job.changes {
        ids.push(actor.actor_id);
        for change in &actor.fields {
            for body in &change.new_values {
                ids.extend(issuehub_core::mentions::extract_mentions(Some(body.as_str())));
            }
        }
    }
    ids.sort_unstable();
    ids.dedup();
    ids
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use assert_matches::assert_matches;
    use chrono::Utc;
    use tokio::sync::Notify;

    use super::*;
    use crate::stacking::{ActorChanges, FieldChange};

    // -- fakes --------------------------------------------------------------

    #[derive(Default)]
    struct MemoryKv {
        entries: Mutex<HashMap<String, String>>,
    }

    impl KeyValueStore for MemoryKv {
        async fn set_nx(&self, key: &str, value: &str, _ttl: Duration) -> Result<bool, StoreError> {
            let mut entries = self.entries.lock().unwrap();
            if entries.contains_key(key) {
                return Ok(false);
            }
            entries.insert(key.to_string(), value.to_string());
            Ok(true)
        }

        async fn release(&self, key: &str, value: &str) -> Result<bool, StoreError> {
            let mut entries = self.entries.lock().unwrap();
            if entries.get(key).map(String::as_str) != Some(value) {
                return Ok(false);
            }
            entries.remove(key);
            Ok(true)
        }

        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }
    }

    struct FakeStore {
        issue: Option<IssueDetail>,
        users: Vec<User>,
        sent: Mutex<HashSet<DbId>>,
    }

    impl DeliveryStore for FakeStore {
        async fn issue(&self, _issue_id: DbId) -> Result<Option<IssueDetail>, sqlx::Error> {
            Ok(self.issue.clone())
        }

        async fn users(&self, ids: &[DbId]) -> Result<Vec<User>, sqlx::Error> {
            Ok(self.users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
        }

        async fn unsent(&self, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
            let sent = self.sent.lock().unwrap();
            Ok(ids.iter().copied().filter(|id| !sent.contains(id)).collect())
        }

        async fn mark_sent(&self, ids: &[DbId]) -> Result<u64, sqlx::Error> {
            let mut sent = self.sent.lock().unwrap();
            Ok(ids.iter().filter(|id| sent.insert(**id)).count() as u64)
        }
    }

    /// Records sends; optionally parks inside `send` until released.
    #[derive(Default)]
    struct GatedMailer {
        sends: AtomicUsize,
        recipients: Mutex<Vec<String>>,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
        fail: bool,
    }

    impl MailTransport for GatedMailer {
        async fn send(&self, to: &str, _subject: &str, _html: &str) -> Result<(), EmailError> {
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            if self.fail {
                return Err(EmailError::Build("gateway down".into()));
            }
            self.sends.fetch_add(1, Ordering::SeqCst);
            self.recipients.lock().unwrap().push(to.to_string());
            Ok(())
        }
    }

    // -- helpers ------------------------------------------------------------

    fn issue() -> IssueDetail {
        IssueDetail {
            id: 42,
            name: "Crash on save".into(),
            sequence_id: 12,
            workspace_id: 1,
            workspace_slug: "acme".into(),
            project_id: 3,
            project_identifier: "WEB".into(),
            state_id: None,
            state_name: None,
            state_group: None,
            created_by: None,
        }
    }

    fn user(id: DbId, name: &str) -> User {
        User {
            id,
            email: format!("{name}@example.com"),
            display_name: name.into(),
        }
    }

    fn store() -> FakeStore {
        FakeStore {
            issue: Some(issue()),
            users: vec![user(9, "bob"), user(5, "ann")],
            sent: Mutex::new(HashSet::new()),
        }
    }

    fn job() -> EmailJob {
        EmailJob {
            issue_id: 42,
            receiver_id: 9,
            changes: vec![ActorChanges {
                actor_id: 5,
                fields: vec![FieldChange {
                    field: "priority".into(),
                    old_values: vec!["low".into()],
                    new_values: vec!["high".into()],
                }],
                activity_time: Utc::now(),
            }],
            email_notification_ids: vec![3, 1, 2],
        }
    }

    // -- tests --------------------------------------------------------------

    #[tokio::test]
    async fn sends_once_and_marks_rows() {
        let dispatcher =
            EmailDispatcher::new(store(), MemoryKv::default(), GatedMailer::default(), "http://localhost:3000");

        assert_eq!(dispatcher.send(&job()).await, DispatchOutcome::Sent);
        assert_eq!(dispatcher.mailer.sends.load(Ordering::SeqCst), 1);
        assert_eq!(*dispatcher.mailer.recipients.lock().unwrap(), vec!["bob@example.com"]);
        assert_eq!(dispatcher.store.sent.lock().unwrap().len(), 3);
        assert!(dispatcher.kv.entries.lock().unwrap().is_empty(), "lock released");

        assert_eq!(dispatcher.send(&job()).await, DispatchOutcome::AlreadySent);
        assert_eq!(dispatcher.mailer.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_attempts_send_at_most_once() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let mailer = GatedMailer {
            gate: Some((entered.clone(), release.clone())),
            ..GatedMailer::default()
        };
        let dispatcher = Arc::new(EmailDispatcher::new(
            store(),
            MemoryKv::default(),
            mailer,
            "http://localhost:3000",
        ));

        let first = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.send(&job()).await }
        });
        entered.notified().await;

        let mut reordered = job();
        reordered.email_notification_ids = vec![2, 3, 1];
        assert_eq!(dispatcher.send(&reordered).await, DispatchOutcome::LockContended);

        release.notify_one();
        assert_eq!(first.await.unwrap(), DispatchOutcome::Sent);
        assert_eq!(dispatcher.mailer.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_issue_releases_lock_without_sending() {
        let mut fake = store();
        fake.issue = None;
        let dispatcher =
            EmailDispatcher::new(fake, MemoryKv::default(), GatedMailer::default(), "http://localhost:3000");

        assert_eq!(dispatcher.send(&job()).await, DispatchOutcome::MissingEntity);
        assert_eq!(dispatcher.mailer.sends.load(Ordering::SeqCst), 0);
        assert!(dispatcher.kv.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_receiver_is_reported() {
        let mut fake = store();
        fake.users.retain(|u| u.id != 9);
        let dispatcher =
            EmailDispatcher::new(fake, MemoryKv::default(), GatedMailer::default(), "http://localhost:3000");

        assert_eq!(dispatcher.send(&job()).await, DispatchOutcome::MissingEntity);
    }

    #[tokio::test]
    async fn gateway_failure_leaves_rows_unsent() {
        let mailer = GatedMailer {
            fail: true,
            ..GatedMailer::default()
        };
        let dispatcher =
            EmailDispatcher::new(store(), MemoryKv::default(), mailer, "http://localhost:3000");

        assert_matches!(dispatcher.send(&job()).await, DispatchOutcome::Failed);
        assert!(dispatcher.store.sent.lock().unwrap().is_empty());
        assert!(dispatcher.kv.entries.lock().unwrap().is_empty(), "lock released on failure");
    }

    #[tokio::test]
    async fn expired_lock_taken_by_another_holder_is_not_released() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let mailer = GatedMailer {
            gate: Some((entered.clone(), release.clone())),
            ..GatedMailer::default()
        };
        let dispatcher = Arc::new(EmailDispatcher::new(
            store(),
            MemoryKv::default(),
            mailer,
            "http://localhost:3000",
        ));
        let key = lock_key(42, 9, &[1, 2, 3]);

        let first = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.send(&job()).await }
        });
        entered.notified().await;

        // TTL lapsed mid-send and a second attempt now owns the key.
        dispatcher
            .kv
            .entries
            .lock()
            .unwrap()
            .insert(key.clone(), "second-attempt".into());

        release.notify_one();
        assert_eq!(first.await.unwrap(), DispatchOutcome::Sent);
        assert_eq!(
            dispatcher.kv.entries.lock().unwrap().get(&key).map(String::as_str),
            Some("second-attempt")
        );
    }

    #[test]
    fn referenced_users_include_mentions_in_bodies() {
        let mut j = job();
        j.changes[0].fields.push(FieldChange {
            field: "comment".into(),
            old_values: vec![],
            new_values: vec![
                r#"<mention-component target="users" id="77">@x</mention-component>"#.into(),
            ],
        });
        assert_eq!(referenced_users(&j), vec![5, 9, 77]);
    }
}
