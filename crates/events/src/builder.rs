//! Notification builder.
//!
//! [`NotificationBuilder::handle`] is the task entry point for issue activity
//! events. It loads the issue context, plans the fan-out and writes every
//! resulting row in one transaction.

use std::collections::{HashMap, HashSet};

use issuehub_core::activity::{IssueActivityEvent, FIELD_STATE};
use issuehub_core::error::CoreError;
use issuehub_core::types::DbId;
use issuehub_db::repositories::{
    EmailNotificationLogRepo, IssueMentionRepo, IssueRepo, IssueSubscriberRepo,
    NotificationPreferenceRepo, NotificationRepo, UserRepo,
};
use issuehub_db::DbPool;

use crate::fanout::{plan_fanout, FanoutContext, FanoutPlan, MentionSets};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Row counts written for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub skipped: bool,
    pub subscriptions: u64,
    pub notifications: u64,
    pub email_logs: u64,
}

// ---------------------------------------------------------------------------
// NotificationBuilder
// ---------------------------------------------------------------------------

pub struct NotificationBuilder {
    pool: DbPool,
}

impl NotificationBuilder {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Process an event, logging and swallowing any failure.
    ///
    /// The triggering mutation has already committed, so nothing is
    /// propagated back to the caller.
    pub async fn handle(&self, event: &IssueActivityEvent) -> Option<BuildSummary> {
        match self.process(event).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::error!(
                    event_type = %event.event_type,
                    issue_id = event.issue_id,
                    project_id = event.project_id,
                    actor_id = event.actor_id,
                    subscribe_actor = event.subscribe_actor,
                    activities = ?event.activities,
                    requested_data = ?event.requested_data,
                    current_instance = ?event.current_instance,
                    error = %e,
                    "Failed to build issue notifications"
                );
                None
            }
        }
    }

    /// Build and persist notifications for `event`.
    pub async fn process(&self, event: &IssueActivityEvent) -> Result<BuildSummary, BuildError> {
        if !event.is_fanout_eligible() {
            tracing::debug!(
                event_type = %event.event_type,
                issue_id = event.issue_id,
                "Event type skipped"
            );
            return Ok(BuildSummary {
                skipped: true,
                ..BuildSummary::default()
            });
        }
        event.ensure_valid()?;

        let issue = IssueRepo::find_detail(&self.pool, event.issue_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "issue",
                id: event.issue_id,
            })?;
        let actor = UserRepo::find_by_id(&self.pool, event.actor_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "user",
                id: event.actor_id,
            })?;

        let mentions = MentionSets::collect(event);
        let subscribers = IssueSubscriberRepo::subscriber_ids(&self.pool, issue.id).await?;
        let assignees = IssueRepo::assignee_ids(&self.pool, issue.id).await?;
        let latest_activity = IssueRepo::latest_activity(&self.pool, issue.id)
            .await?
            .and_then(|row| row.into_record());

        let state_ids: Vec<DbId> = event
            .activities
            .iter()
            .filter(|a| a.field() == Some(FIELD_STATE))
            .filter_map(|a| a.new_identifier)
            .collect();
        let completed_states: HashSet<DbId> =
            IssueRepo::completed_state_ids(&self.pool, issue.project_id, &state_ids)
                .await?
                .into_iter()
                .collect();

        let comment_ids: Vec<DbId> = event
            .comment_activities()
            .filter_map(|a| a.issue_comment_id)
            .collect();
        let comment_bodies: HashMap<DbId, String> =
            IssueRepo::comment_bodies(&self.pool, issue.id, &comment_ids)
                .await?
                .into_iter()
                .map(|c| (c.id, c.comment_stripped))
                .collect();

        // Preferences of everyone who may receive something from this batch.
        let mut audience: HashSet<DbId> = subscribers.iter().copied().collect();
        audience.extend(mentions.mentioned());
        audience.remove(&event.actor_id);
        let audience: Vec<DbId> = audience.into_iter().collect();
        let preferences = NotificationPreferenceRepo::resolve_for_users(
            &self.pool,
            &audience,
            issue.workspace_id,
            issue.project_id,
        )
        .await?;

        let ctx = FanoutContext {
            event,
            issue: &issue,
            actor_name: &actor.display_name,
            subscribers: &subscribers,
            assignees: &assignees,
            preferences: &preferences,
            completed_states: &completed_states,
            comment_bodies: &comment_bodies,
            latest_activity: latest_activity.as_ref(),
        };
        let plan = plan_fanout(&ctx, &mentions);
        let summary = self.persist(issue.id, &plan).await?;

        tracing::info!(
            issue_id = issue.id,
            actor_id = event.actor_id,
            new_mentions = mentions.new_mentions.len(),
            subscriptions = summary.subscriptions,
            notifications = summary.notifications,
            email_logs = summary.email_logs,
            "Issue notifications built"
        );
        Ok(summary)
    }

    async fn persist(&self, issue_id: DbId, plan: &FanoutPlan) -> Result<BuildSummary, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let mut subscriptions =
            IssueSubscriberRepo::bulk_insert(&mut *tx, &plan.subscriptions).await?;
        if let Some(actor) = &plan.actor_subscription {
            if IssueSubscriberRepo::ensure_subscribed(&mut *tx, actor).await? {
                subscriptions += 1;
            }
        }

        IssueMentionRepo::bulk_insert(&mut *tx, &plan.mentions_added).await?;
        IssueMentionRepo::delete_for_users(&mut *tx, issue_id, &plan.mentions_removed).await?;

        let notifications = NotificationRepo::bulk_create(&mut *tx, &plan.notifications).await?;
        let email_logs = EmailNotificationLogRepo::bulk_create(&mut *tx, &plan.email_logs).await?;

        tx.commit().await?;

        Ok(BuildSummary {
            skipped: false,
            subscriptions,
            notifications,
            email_logs,
        })
    }
}
