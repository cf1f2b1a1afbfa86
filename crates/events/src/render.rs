//! HTML rendering for stacked issue emails.

use std::collections::HashMap;
use std::fmt::Write;

use issuehub_core::activity::{FIELD_COMMENT, FIELD_MENTION};
use issuehub_core::html::escape_html;
use issuehub_core::mentions::mention_text;
use issuehub_core::types::DbId;
use issuehub_db::models::issue::IssueDetail;
use issuehub_db::models::user::User;

use crate::stacking::{ActorChanges, FieldChange};

/// A composed email ready for the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Escape plain text and keep its line breaks.
fn text_block(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

/// Link to the issue in the web app.
pub fn issue_url(base_url: &str, issue: &IssueDetail) -> String {
    format!(
        "{}/{}/projects/{}/issues/{}",
        base_url.trim_end_matches('/'),
        issue.workspace_slug,
        issue.project_id,
        issue.id
    )
}

fn display_name(users: &HashMap<DbId, User>, id: DbId) -> String {
    users
        .get(&id)
        .map(|u| u.display_name.clone())
        .unwrap_or_else(|| "Someone".to_string())
}

/// Render the email summarising `changes` on `issue`.
///
/// Comment and mention bodies are reduced to plain text with mention
/// components shown as `@display name`. Every value is escaped.
pub fn render_issue_email(
    issue: &IssueDetail,
    changes: &[ActorChanges],
    users: &HashMap<DbId, User>,
    base_url: &str,
) -> RenderedEmail {
    let subject = format!("{} {}", issue.key(), issue.name);
    let url = issue_url(base_url, issue);
    let resolve = |id: DbId| users.get(&id).map(|u| u.display_name.clone());

    let mut html = String::new();
    let _ = write!(
        html,
        "<h2><a href=\"{}\">{}</a> {}</h2>",
        escape_html(&url),
        escape_html(&issue.key()),
        escape_html(&issue.name)
    );
    let _ = write!(
        html,
        "<p>Updates were made to the issue by {} {}.</p>",
        changes.len(),
        if changes.len() == 1 { "person" } else { "people" }
    );

    for actor in changes {
        let _ = write!(
            html,
            "<div class=\"actor\"><p><strong>{}</strong> at {}</p>",
            escape_html(&display_name(users, actor.actor_id)),
            actor.activity_time.format("%H:%M")
        );

        let properties: Vec<&FieldChange> = actor
            .fields
            .iter()
            .filter(|f| f.field != FIELD_COMMENT && f.field != FIELD_MENTION)
            .collect();
        if !properties.is_empty() {
            html.push_str("<ul>");
            for change in properties {
                let _ = write!(
                    html,
                    "<li>{}: {} &rarr; {}</li>",
                    escape_html(&change.field),
                    escape_html(&change.old_values.join(", ")),
                    escape_html(&change.new_values.join(", "))
                );
            }
            html.push_str("</ul>");
        }

        for field in [FIELD_COMMENT, FIELD_MENTION] {
            if let Some(change) = actor.field(field) {
                for body in &change.new_values {
                    let _ = write!(
                        html,
                        "<blockquote class=\"{field}\">{}</blockquote>",
                        text_block(&mention_text(body, &resolve))
                    );
                }
            }
        }
        html.push_str("</div>");
    }

    let _ = write!(
        html,
        "<p><a href=\"{}\">View issue</a> &middot; \
         <a href=\"{}/profile/preferences/email\">Email preferences</a></p>",
        escape_html(&url),
        escape_html(base_url.trim_end_matches('/'))
    );

    RenderedEmail { subject, html }
}
