//! Distributed lock keys for email delivery.

use issuehub_core::types::DbId;

/// Lock key for one stacked email.
///
/// The id set is sorted so that the same rows always map to the same key,
/// whatever order the stacker listed them in.
pub fn lock_key(issue_id: DbId, receiver_id: DbId, notification_ids: &[DbId]) -> String {
    let mut ids = notification_ids.to_vec();
    ids.sort_unstable();
    let joined = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("_");
    format!("send_email_notif_{issue_id}_{receiver_id}_{joined}")
}
