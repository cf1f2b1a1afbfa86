//! Fan-out planning.
//!
//! [`plan_fanout`] decides, without touching the database, which rows an
//! activity batch produces: mention-derived subscriptions, mention ledger
//! changes, in-app notifications and email log rows. The builder loads the
//! [`FanoutContext`] and persists the resulting [`FanoutPlan`].

use std::collections::{HashMap, HashSet};

use issuehub_core::activity::{ActivityRecord, IssueActivityEvent, FIELD_MENTION, FIELD_STATE};
use issuehub_core::diff::{diff_mentions, new_comment_mentions};
use issuehub_core::mentions::{extract_description_mentions, extract_mentions};
use issuehub_core::payload::{ActivitySnapshot, NotificationPayload};
use issuehub_core::preferences::{ChangeCategory, NotificationPreference};
use issuehub_core::senders::{SubscriberRole, ENTITY_ISSUE, SENDER_MENTIONED};
use issuehub_core::subscribers::select_new_subscribers;
use issuehub_core::types::DbId;
use issuehub_db::models::email_log::NewEmailNotificationLog;
use issuehub_db::models::issue::IssueDetail;
use issuehub_db::models::notification::NewNotification;
use issuehub_db::models::subscriber::{NewIssueMention, NewIssueSubscriber};

// ---------------------------------------------------------------------------
// Mentions
// ---------------------------------------------------------------------------

/// Mention sets derived from one activity batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionSets {
    /// Users newly mentioned in the description.
    pub new_mentions: Vec<DbId>,
    /// Users no longer mentioned in the description.
    pub removed_mentions: Vec<DbId>,
    /// Every user mentioned in the new body of a comment in the batch.
    pub comment_mentions: Vec<DbId>,
    /// Users newly mentioned by a comment create or edit.
    pub new_comment_mentions: Vec<DbId>,
}

impl MentionSets {
    pub fn collect(event: &IssueActivityEvent) -> Self {
        let description = diff_mentions(
            &extract_description_mentions(event.current_instance.as_deref()),
            &extract_description_mentions(event.requested_data.as_deref()),
        );

        let mut comment_mentions = Vec::new();
        let mut new_comments = Vec::new();
        for activity in event.comment_activities() {
            comment_mentions.extend(extract_mentions(activity.new_value.as_deref()));
            new_comments.extend(new_comment_mentions(
                activity.new_value.as_deref(),
                activity.old_value.as_deref(),
            ));
        }

        Self {
            new_mentions: description.added,
            removed_mentions: description.removed,
            comment_mentions: distinct(comment_mentions),
            new_comment_mentions: distinct(new_comments),
        }
    }

    /// Users that get a mention notification instead of a generic one.
    pub fn mentioned(&self) -> HashSet<DbId> {
        self.new_mentions
            .iter()
            .chain(&self.new_comment_mentions)
            .copied()
            .collect()
    }
}

fn distinct(ids: Vec<DbId>) -> Vec<DbId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

// ---------------------------------------------------------------------------
// Context and plan
// ---------------------------------------------------------------------------

/// Everything [`plan_fanout`] reads.
#[derive(Debug)]
pub struct FanoutContext<'a> {
    pub event: &'a IssueActivityEvent,
    pub issue: &'a IssueDetail,
    pub actor_name: &'a str,
    /// Subscribers before this batch is applied.
    pub subscribers: &'a [DbId],
    pub assignees: &'a [DbId],
    /// Effective preferences; missing users get the defaults.
    pub preferences: &'a HashMap<DbId, NotificationPreference>,
    /// State ids in the `completed` group.
    pub completed_states: &'a HashSet<DbId>,
    /// Stripped comment bodies by comment id.
    pub comment_bodies: &'a HashMap<DbId, String>,
    /// Latest activity recorded on the issue.
    pub latest_activity: Option<&'a ActivityRecord>,
}

/// Rows to persist for one activity batch.
#[derive(Debug, Default)]
pub struct FanoutPlan {
    pub subscriptions: Vec<NewIssueSubscriber>,
    pub actor_subscription: Option<NewIssueSubscriber>,
    pub mentions_added: Vec<NewIssueMention>,
    pub mentions_removed: Vec<DbId>,
    pub notifications: Vec<NewNotification>,
    pub email_logs: Vec<NewEmailNotificationLog>,
}

impl FanoutContext<'_> {
    fn actor(&self) -> DbId {
        self.event.actor_id
    }

    fn preference(&self, user: DbId) -> NotificationPreference {
        self.preferences.get(&user).copied().unwrap_or_default()
    }

    fn subscription(&self, user: DbId) -> NewIssueSubscriber {
        NewIssueSubscriber {
            workspace_id: self.issue.workspace_id,
            project_id: self.issue.project_id,
            issue_id: self.issue.id,
            subscriber_id: user,
            created_by: self.actor(),
        }
    }

    fn payload(&self, activity: &ActivityRecord) -> NotificationPayload {
        let comment = activity
            .issue_comment_id
            .and_then(|id| self.comment_bodies.get(&id).cloned());
        NotificationPayload {
            issue: self.issue.snapshot(),
            issue_activity: ActivitySnapshot::from_record(activity).with_issue_comment(comment),
        }
    }

    fn notification(
        &self,
        receiver: DbId,
        sender: &str,
        title: Option<String>,
        message: Option<String>,
        data: NotificationPayload,
    ) -> NewNotification {
        NewNotification {
            workspace_id: self.issue.workspace_id,
            project_id: self.issue.project_id,
            receiver_id: receiver,
            triggered_by_id: self.actor(),
            entity_identifier: self.issue.id,
            entity_name: ENTITY_ISSUE.to_string(),
            sender: sender.to_string(),
            title,
            message,
            data,
        }
    }

    fn email_log(&self, receiver: DbId, data: NotificationPayload) -> NewEmailNotificationLog {
        NewEmailNotificationLog {
            receiver_id: receiver,
            triggered_by_id: self.actor(),
            entity_identifier: self.issue.id,
            entity_name: ENTITY_ISSUE.to_string(),
            data,
        }
    }

    fn completes_issue(&self, activity: &ActivityRecord) -> bool {
        activity.field() == Some(FIELD_STATE)
            && activity
                .new_identifier
                .is_some_and(|id| self.completed_states.contains(&id))
    }

    /// Whether the latest recorded activity is a description edit by the actor.
    fn collapses_description_mentions(&self) -> Option<&ActivityRecord> {
        self.latest_activity
            .filter(|a| a.is_description() && a.actor_id == self.actor())
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Plan every row produced by the batch in `ctx`.
pub fn plan_fanout(ctx: &FanoutContext<'_>, mentions: &MentionSets) -> FanoutPlan {
    let mut plan = FanoutPlan::default();
    let actor = ctx.actor();
    let creator = ctx.issue.created_by;

    // Mention-derived subscriptions.
    let mut new_subscribers =
        select_new_subscribers(&mentions.new_mentions, ctx.subscribers, ctx.assignees, creator);
    for id in select_new_subscribers(&mentions.comment_mentions, ctx.subscribers, ctx.assignees, creator) {
        if !new_subscribers.contains(&id) {
            new_subscribers.push(id);
        }
    }
    plan.subscriptions = new_subscribers.into_iter().map(|id| ctx.subscription(id)).collect();

    if ctx.event.subscribe_actor {
        plan.actor_subscription = Some(ctx.subscription(actor));
    }

    // Mention ledger.
    plan.mentions_added = mentions
        .new_mentions
        .iter()
        .map(|&mention_id| NewIssueMention {
            workspace_id: ctx.issue.workspace_id,
            project_id: ctx.issue.project_id,
            issue_id: ctx.issue.id,
            mention_id,
            created_by: actor,
        })
        .collect();
    plan.mentions_removed = mentions.removed_mentions.clone();

    plan_subscriber_notifications(ctx, mentions, &mut plan);
    plan_mention_notifications(ctx, mentions, &mut plan);

    plan
}

/// Recipients of generic notifications: subscribers minus the actor minus
/// everyone who gets a mention notification.
pub fn notification_recipients(ctx: &FanoutContext<'_>, mentions: &MentionSets) -> Vec<DbId> {
    let mut excluded = mentions.mentioned();
    excluded.insert(ctx.actor());
    ctx.subscribers
        .iter()
        .copied()
        .filter(|id| excluded.insert(*id))
        .collect()
}

fn plan_subscriber_notifications(
    ctx: &FanoutContext<'_>,
    mentions: &MentionSets,
    plan: &mut FanoutPlan,
) {
    for recipient in notification_recipients(ctx, mentions) {
        let role = SubscriberRole::classify(recipient, ctx.issue.created_by, |id| {
            ctx.assignees.contains(&id)
        });
        let preference = ctx.preference(recipient);

        for activity in &ctx.event.activities {
            if !activity.belongs_to(ctx.event.issue_id) || activity.is_description() {
                continue;
            }
            let payload = ctx.payload(activity);
            let category = ChangeCategory::of(activity.field(), ctx.completes_issue(activity));

            if preference.allows_email(category) {
                plan.email_logs.push(ctx.email_log(recipient, payload.clone()));
            }
            plan.notifications.push(ctx.notification(
                recipient,
                role.sender(),
                Some(activity.comment.clone()),
                None,
                payload,
            ));
        }
    }
}

fn plan_mention_notifications(ctx: &FanoutContext<'_>, mentions: &MentionSets, plan: &mut FanoutPlan) {
    let actor = ctx.actor();
    let issue_name = &ctx.issue.name;

    let comment_message = format!(
        "{} has mentioned you in a comment in issue {issue_name}",
        ctx.actor_name
    );
    for &mentioned in mentions.new_comment_mentions.iter().filter(|&&id| id != actor) {
        let preference = ctx.preference(mentioned);
        for activity in &ctx.event.activities {
            push_mention(ctx, plan, mentioned, preference, activity, &comment_message);
        }
    }

    let description_message = format!("You have been mentioned in the issue {issue_name}");
    let collapse_into = ctx.collapses_description_mentions();
    for &mentioned in mentions.new_mentions.iter().filter(|&&id| id != actor) {
        let preference = ctx.preference(mentioned);
        match collapse_into {
            Some(latest) => {
                push_mention(ctx, plan, mentioned, preference, latest, &description_message);
            }
            None => {
                for activity in &ctx.event.activities {
                    push_mention(ctx, plan, mentioned, preference, activity, &description_message);
                }
            }
        }
    }
}

fn push_mention(
    ctx: &FanoutContext<'_>,
    plan: &mut FanoutPlan,
    mentioned: DbId,
    preference: NotificationPreference,
    activity: &ActivityRecord,
    message: &str,
) {
    let payload = ctx.payload(activity);
    if preference.allows_email(ChangeCategory::Mention) {
        let mut email_payload = payload.clone();
        email_payload.issue_activity = email_payload.issue_activity.with_field(FIELD_MENTION);
        plan.email_logs.push(ctx.email_log(mentioned, email_payload));
    }
    plan.notifications.push(ctx.notification(
        mentioned,
        SENDER_MENTIONED,
        None,
        Some(message.to_string()),
        payload,
    ));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use issuehub_core::senders::{SENDER_ASSIGNED, SENDER_CREATED, SENDER_SUBSCRIBED};

    use super::*;

    const ISSUE: DbId = 42;
    const ACTOR: DbId = 1;

    fn issue(created_by: Option<DbId>) -> IssueDetail {
        IssueDetail {
            id: ISSUE,
            name: "Crash on save".into(),
            sequence_id: 12,
            workspace_id: 10,
            workspace_slug: "acme".into(),
            project_id: 20,
            project_identifier: "WEB".into(),
            state_id: None,
            state_name: None,
            state_group: None,
            created_by,
        }
    }

    fn activity(id: DbId, field: &str, old: Option<&str>, new: Option<&str>) -> ActivityRecord {
        ActivityRecord {
            id,
            issue_id: Some(ISSUE),
            actor_id: ACTOR,
            verb: "updated".into(),
            field: Some(field.into()),
            old_value: old.map(Into::into),
            new_value: new.map(Into::into),
            comment: format!("updated the {field}"),
            issue_comment_id: None,
            old_identifier: None,
            new_identifier: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        }
    }

    fn description(html: &str) -> Option<String> {
        Some(serde_json::json!({ "description_html": html }).to_string())
    }

    fn mention_html(ids: &[DbId]) -> String {
        ids.iter()
            .map(|id| format!(r#"<mention-component target="users" id="{id}">@u</mention-component>"#))
            .collect()
    }

    fn event(activities: Vec<ActivityRecord>) -> IssueActivityEvent {
        IssueActivityEvent {
            event_type: "issue.activity.updated".into(),
            issue_id: ISSUE,
            project_id: 20,
            actor_id: ACTOR,
            subscribe_actor: false,
            activities,
            requested_data: None,
            current_instance: None,
        }
    }

    struct Fixture {
        issue: IssueDetail,
        subscribers: Vec<DbId>,
        assignees: Vec<DbId>,
        preferences: HashMap<DbId, NotificationPreference>,
        completed: HashSet<DbId>,
        comments: HashMap<DbId, String>,
        latest: Option<ActivityRecord>,
    }

    impl Fixture {
        fn new(subscribers: Vec<DbId>) -> Self {
            Self {
                issue: issue(None),
                subscribers,
                assignees: vec![],
                preferences: HashMap::new(),
                completed: HashSet::new(),
                comments: HashMap::new(),
                latest: None,
            }
        }

        fn plan(&self, event: &IssueActivityEvent) -> (MentionSets, FanoutPlan) {
            let ctx = FanoutContext {
                event,
                issue: &self.issue,
                actor_name: "Ann",
                subscribers: &self.subscribers,
                assignees: &self.assignees,
                preferences: &self.preferences,
                completed_states: &self.completed,
                comment_bodies: &self.comments,
                latest_activity: self.latest.as_ref(),
            };
            let mentions = MentionSets::collect(event);
            let plan = plan_fanout(&ctx, &mentions);
            (mentions, plan)
        }
    }

    fn receivers(notifications: &[NewNotification], sender: &str) -> HashSet<DbId> {
        notifications
            .iter()
            .filter(|n| n.sender == sender)
            .map(|n| n.receiver_id)
            .collect()
    }

    #[test]
    fn description_mention_subscribes_and_notifies_only_the_mentioned_user() {
        let fixture = Fixture::new(vec![ACTOR]);
        let mut ev = event(vec![activity(100, "description", Some("<p>hi</p>"), None)]);
        ev.current_instance = description("<p>hi</p>");
        ev.requested_data = description(&format!("<p>hi {}</p>", mention_html(&[7])));

        let (mentions, plan) = fixture.plan(&ev);

        assert_eq!(mentions.new_mentions, vec![7]);
        assert_eq!(plan.subscriptions.len(), 1);
        assert_eq!(plan.subscriptions[0].subscriber_id, 7);
        assert_eq!(plan.notifications.len(), 1);
        assert_eq!(plan.notifications[0].receiver_id, 7);
        assert_eq!(plan.notifications[0].sender, SENDER_MENTIONED);
        assert_eq!(
            plan.notifications[0].message.as_deref(),
            Some("You have been mentioned in the issue Crash on save")
        );
        assert_eq!(plan.email_logs.len(), 1);
        assert_eq!(plan.email_logs[0].receiver_id, 7);
        assert_eq!(
            plan.email_logs[0].data.issue_activity.field.as_deref(),
            Some(FIELD_MENTION)
        );
        assert_eq!(plan.mentions_added.len(), 1);
    }

    #[test]
    fn mention_email_respects_mention_preference() {
        let mut fixture = Fixture::new(vec![]);
        fixture.preferences.insert(
            7,
            NotificationPreference {
                mention: false,
                ..NotificationPreference::default()
            },
        );
        let mut ev = event(vec![activity(100, "description", None, None)]);
        ev.requested_data = description(&mention_html(&[7]));

        let (_, plan) = fixture.plan(&ev);
        assert_eq!(plan.notifications.len(), 1);
        assert!(plan.email_logs.is_empty());
    }

    #[test]
    fn completed_state_email_gated_by_issue_completed() {
        let mut fixture = Fixture::new(vec![ACTOR, 2]);
        fixture.completed.insert(555);
        fixture.preferences.insert(
            2,
            NotificationPreference {
                state_change: false,
                issue_completed: true,
                ..NotificationPreference::default()
            },
        );
        let mut state = activity(100, "state", Some("Todo"), Some("Done"));
        state.new_identifier = Some(555);

        let (_, plan) = fixture.plan(&event(vec![state.clone()]));
        assert_eq!(plan.notifications.len(), 1);
        assert_eq!(plan.notifications[0].receiver_id, 2);
        assert_eq!(plan.email_logs.len(), 1);

        state.new_identifier = Some(556);
        let (_, plan) = fixture.plan(&event(vec![state]));
        assert_eq!(plan.notifications.len(), 1);
        assert!(plan.email_logs.is_empty(), "non-completing state needs state_change");
    }

    #[test]
    fn email_gating_matches_preferences_for_every_combination() {
        let mut fixture = Fixture::new(vec![2]);
        fixture.completed.insert(555);
        let mut state = activity(101, "state", None, None);
        state.new_identifier = Some(555);
        let ev = event(vec![
            activity(100, "priority", Some("low"), Some("high")),
            state,
            activity(102, "comment", None, Some("<p>ok</p>")),
        ]);

        for bits in 0u8..32 {
            let preference = NotificationPreference {
                property_change: bits & 1 != 0,
                state_change: bits & 2 != 0,
                comment: bits & 4 != 0,
                mention: bits & 8 != 0,
                issue_completed: bits & 16 != 0,
            };
            fixture.preferences.insert(2, preference);
            let (_, plan) = fixture.plan(&ev);

            assert_eq!(plan.notifications.len(), 3, "notifications are never gated");
            let emailed: Vec<Option<String>> = plan
                .email_logs
                .iter()
                .map(|l| l.data.issue_activity.field.clone())
                .collect();
            let has = |f: &str| emailed.iter().any(|e| e.as_deref() == Some(f));
            assert_eq!(has("priority"), preference.property_change, "{preference:?}");
            assert_eq!(
                has("state"),
                preference.state_change || preference.issue_completed,
                "{preference:?}"
            );
            assert_eq!(has("comment"), preference.comment, "{preference:?}");
        }
    }

    #[test]
    fn recipients_exclude_actor_and_mentioned_users() {
        let fixture = Fixture::new(vec![ACTOR, 2, 3, 7, 8]);
        let mut comment = activity(100, "comment", None, Some(mention_html(&[8]).as_str()));
        comment.issue_comment_id = Some(900);
        let mut ev = event(vec![comment, activity(101, "priority", None, Some("high"))]);
        ev.requested_data = description(&mention_html(&[7]));

        let (mentions, plan) = fixture.plan(&ev);
        let mentioned = mentions.mentioned();
        let generic: HashSet<DbId> = plan
            .notifications
            .iter()
            .filter(|n| n.sender != SENDER_MENTIONED)
            .map(|n| n.receiver_id)
            .collect();
        let mention_receivers = receivers(&plan.notifications, SENDER_MENTIONED);

        assert_eq!(generic, HashSet::from([2, 3]));
        assert_eq!(mention_receivers, HashSet::from([7, 8]));
        assert!(generic.is_disjoint(&mentioned));
        assert!(!generic.contains(&ACTOR) && !mention_receivers.contains(&ACTOR));
    }

    #[test]
    fn comment_mentions_notify_per_activity() {
        let fixture = Fixture::new(vec![]);
        let mut comment = activity(100, "comment", None, Some(mention_html(&[8]).as_str()));
        comment.issue_comment_id = Some(900);
        let ev = event(vec![comment, activity(101, "priority", None, Some("high"))]);

        let (mentions, plan) = fixture.plan(&ev);
        assert_eq!(mentions.new_comment_mentions, vec![8]);
        assert_eq!(plan.notifications.len(), 2);
        assert!(plan.notifications.iter().all(|n| n.message.as_deref()
            == Some("Ann has mentioned you in a comment in issue Crash on save")));
        assert_eq!(plan.email_logs.len(), 2);
        assert_eq!(plan.subscriptions[0].subscriber_id, 8);
    }

    #[test]
    fn edited_comment_only_notifies_newly_mentioned() {
        let fixture = Fixture::new(vec![5]);
        let mut comment = activity(
            100,
            "comment",
            Some(mention_html(&[5]).as_str()),
            Some(mention_html(&[5, 6]).as_str()),
        );
        comment.issue_comment_id = Some(900);

        let (mentions, plan) = fixture.plan(&event(vec![comment]));
        assert_eq!(mentions.comment_mentions, vec![5, 6]);
        assert_eq!(mentions.new_comment_mentions, vec![6]);
        assert_eq!(receivers(&plan.notifications, SENDER_MENTIONED), HashSet::from([6]));
        assert_eq!(receivers(&plan.notifications, SENDER_SUBSCRIBED), HashSet::from([5]));
    }

    #[test]
    fn description_edit_collapses_mentions_into_latest_activity() {
        let mut fixture = Fixture::new(vec![]);
        let latest = activity(200, "description", None, None);
        fixture.latest = Some(latest);
        let mut ev = event((0..5).map(|i| activity(300 + i, "description", None, None)).collect());
        ev.requested_data = description(&mention_html(&[7, 8]));

        let (_, plan) = fixture.plan(&ev);
        assert_eq!(plan.notifications.len(), 2, "one per mentioned user");
        assert!(plan.notifications.iter().all(|n| n.data.issue_activity.id == 200));
        assert_eq!(plan.email_logs.len(), 2);
    }

    #[test]
    fn no_collapse_when_latest_activity_is_by_someone_else() {
        let mut fixture = Fixture::new(vec![]);
        let mut latest = activity(200, "description", None, None);
        latest.actor_id = 99;
        fixture.latest = Some(latest);
        let mut ev = event((0..3).map(|i| activity(300 + i, "description", None, None)).collect());
        ev.requested_data = description(&mention_html(&[7]));

        let (_, plan) = fixture.plan(&ev);
        assert_eq!(plan.notifications.len(), 3);
    }

    #[test]
    fn actor_is_never_mention_notified() {
        let fixture = Fixture::new(vec![]);
        let mut ev = event(vec![activity(100, "description", None, None)]);
        ev.requested_data = description(&mention_html(&[ACTOR]));

        let (_, plan) = fixture.plan(&ev);
        assert!(plan.notifications.is_empty());
        assert_eq!(plan.subscriptions.len(), 1, "self-mention still subscribes");
    }

    #[test]
    fn sender_reflects_recipient_role() {
        let mut fixture = Fixture::new(vec![2, 3, 4]);
        fixture.issue = issue(Some(2));
        fixture.assignees = vec![3];
        let (_, plan) = fixture.plan(&event(vec![activity(100, "priority", None, Some("high"))]));

        assert_eq!(receivers(&plan.notifications, SENDER_CREATED), HashSet::from([2]));
        assert_eq!(receivers(&plan.notifications, SENDER_ASSIGNED), HashSet::from([3]));
        assert_eq!(receivers(&plan.notifications, SENDER_SUBSCRIBED), HashSet::from([4]));
    }

    #[test]
    fn skips_foreign_issue_activities_and_existing_subscribers() {
        let mut fixture = Fixture::new(vec![2, 7]);
        fixture.assignees = vec![8];
        let mut foreign = activity(100, "blocked_by", None, Some("WEB-3"));
        foreign.issue_id = Some(43);
        let mut ev = event(vec![foreign]);
        ev.requested_data = description(&mention_html(&[7, 8, 9]));

        let (_, plan) = fixture.plan(&ev);
        let subscribed: Vec<DbId> = plan.subscriptions.iter().map(|s| s.subscriber_id).collect();
        assert_eq!(subscribed, vec![9]);
        assert!(plan
            .notifications
            .iter()
            .all(|n| n.sender == SENDER_MENTIONED));
    }

    #[test]
    fn removed_description_mentions_leave_the_ledger() {
        let fixture = Fixture::new(vec![]);
        let mut ev = event(vec![activity(100, "description", None, None)]);
        ev.current_instance = description(&mention_html(&[7, 8]));
        ev.requested_data = description(&mention_html(&[8]));
        ev.subscribe_actor = true;

        let (_, plan) = fixture.plan(&ev);
        assert_eq!(plan.mentions_removed, vec![7]);
        assert!(plan.mentions_added.is_empty());
        assert_eq!(plan.actor_subscription.map(|s| s.subscriber_id), Some(ACTOR));
    }
}
