//! Subscriber derivation for mentioned users.

use std::collections::HashSet;

use crate::types::DbId;

/// Candidates that should become new issue subscribers.
///
/// Drops users who already subscribe, are assigned, or created the issue.
/// The result is deduplicated and keeps candidate order.
pub fn select_new_subscribers(
    candidates: &[DbId],
    existing_subscribers: &[DbId],
    assignees: &[DbId],
    creator: Option<DbId>,
) -> Vec<DbId> {
    let mut skip: HashSet<DbId> = existing_subscribers
        .iter()
        .chain(assignees)
        .copied()
        .chain(creator)
        .collect();

    candidates.iter().copied().filter(|id| skip.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_subscribers_assignees_and_creator() {
        let picked = select_new_subscribers(&[1, 2, 3, 4, 5], &[1], &[2], Some(3));
        assert_eq!(picked, vec![4, 5]);
    }

    #[test]
    fn deduplicates_candidates() {
        assert_eq!(select_new_subscribers(&[7, 7, 8], &[], &[], None), vec![7, 8]);
    }

    #[test]
    fn selecting_again_after_subscribing_yields_nothing() {
        let first = select_new_subscribers(&[7, 8], &[], &[], None);
        let second = select_new_subscribers(&[7, 8], &first, &[], None);
        assert!(second.is_empty());
    }
}
