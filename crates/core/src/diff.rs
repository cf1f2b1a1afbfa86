//! Mention snapshot diffing.
//!
//! Compares the mentions of an older and a newer snapshot of the same rich-text
//! field. Used for issue descriptions and comment edits alike.

use std::collections::HashSet;

use crate::mentions::extract_mentions;
use crate::types::DbId;

/// Result of comparing two mention snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionDiff {
    /// Present only in the newer snapshot, in newer-snapshot order.
    pub added: Vec<DbId>,
    /// Present only in the older snapshot, in older-snapshot order.
    pub removed: Vec<DbId>,
}

impl MentionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute `added = newer - older` and `removed = older - newer`.
pub fn diff_mentions(older: &[DbId], newer: &[DbId]) -> MentionDiff {
    let older_set: HashSet<DbId> = older.iter().copied().collect();
    let newer_set: HashSet<DbId> = newer.iter().copied().collect();

    MentionDiff {
        added: distinct(newer.iter().copied().filter(|id| !older_set.contains(id))),
        removed: distinct(older.iter().copied().filter(|id| !newer_set.contains(id))),
    }
}

/// Mentions newly introduced by a comment edit.
///
/// A freshly created comment has no old body, so every mention in it is new.
pub fn new_comment_mentions(new_html: Option<&str>, old_html: Option<&str>) -> Vec<DbId> {
    let newer = extract_mentions(new_html);
    match old_html {
        None => newer,
        Some(old) => diff_mentions(&extract_mentions(Some(old)), &newer).added,
    }
}

fn distinct(ids: impl Iterator<Item = DbId>) -> Vec<DbId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}
