//! User-mention extraction from rich-text HTML.
//!
//! The editor stores mentions inline as
//! `<mention-component target="users" id="7">@bob</mention-component>`.
//! Extraction is best-effort: malformed or missing input yields no mentions
//! instead of an error, because descriptions and comments arrive as partially
//! formed JSON-in-string blobs from the activity recorder.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::html;
use crate::types::{parse_db_id, DbId};

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// Opening `<mention-component ...>` tag; captures the attribute section.
///
/// Closing tags are not required so that truncated fragments still yield
/// their mentions.
static OPEN_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<mention-component\b([^>]*)>").expect("valid regex")
});

/// A complete mention element, either self-closing or with inner content.
static ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<mention-component\b([^>]*?)(?:/>|>(.*?)</mention-component\s*>)")
        .expect("valid regex")
});

/// One `name="value"`, `name='value'` or `name=value` attribute.
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
        .expect("valid regex")
});

/// Key under which the issue JSON blob carries its description.
const DESCRIPTION_HTML_KEY: &str = "description_html";

/// Mention target for user references.
const TARGET_USERS: &str = "users";

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract the deduplicated user ids mentioned in an HTML fragment.
///
/// Ids are returned in document order. `None`, empty input, mentions whose
/// target is not `users`, and non-numeric ids produce nothing.
pub fn extract_mentions(html: Option<&str>) -> Vec<DbId> {
    let Some(html) = html.filter(|h| !h.trim().is_empty()) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    OPEN_TAG_RE
        .captures_iter(html)
        .filter_map(|caps| user_mention_id(caps.get(1).map_or("", |m| m.as_str())))
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Extract mentions from an issue snapshot serialised as JSON.
///
/// The snapshot is a JSON object whose `description_html` key holds the
/// rich-text description. Anything that does not decode to that shape yields
/// no mentions.
pub fn extract_description_mentions(issue_json: Option<&str>) -> Vec<DbId> {
    let Some(raw) = issue_json.filter(|s| !s.trim().is_empty()) else {
        return Vec::new();
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Vec::new();
    };

    extract_mentions(value.get(DESCRIPTION_HTML_KEY).and_then(|v| v.as_str()))
}

/// Replace every user mention element with `@{display name}`.
///
/// `resolve` maps a user id to its display name. Elements that cannot be
/// resolved (unknown user, non-user target, unparsable id) are replaced by
/// their inner text so that no raw component markup leaks into emails.
pub fn replace_mentions(html: &str, resolve: impl Fn(DbId) -> Option<String>) -> String {
    ELEMENT_RE
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let inner = caps.get(2).map_or("", |m| m.as_str()).to_string();
            user_mention_id(caps.get(1).map_or("", |m| m.as_str()))
                .and_then(&resolve)
                .map(|name| format!("@{name}"))
                .unwrap_or(inner)
        })
        .into_owned()
}

/// Plain text of a rich-text body with user mentions shown as `@{display name}`.
///
/// Display names are treated as text, never as markup.
pub fn mention_text(body: &str, resolve: impl Fn(DbId) -> Option<String>) -> String {
    let replaced = replace_mentions(body, |id| resolve(id).map(|name| html::escape_html(&name)));
    html::to_text(&replaced)
}

/// Return the mentioned user id if the attribute section describes a user mention.
fn user_mention_id(attrs: &str) -> Option<DbId> {
    let mut target = None;
    let mut id = None;

    for caps in ATTR_RE.captures_iter(attrs) {
        let name = caps.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        match name.as_str() {
            "target" => target = Some(value.trim().to_ascii_lowercase()),
            "id" => id = parse_db_id(value),
            _ => {}
        }
    }

    match target.as_deref() {
        Some(TARGET_USERS) => id,
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
