//! Email notification preferences and change-category gating.

use serde::{Deserialize, Serialize};

use crate::activity::{FIELD_COMMENT, FIELD_MENTION, FIELD_STATE};

/// Per-user email flags. Users without a stored row get every flag enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub property_change: bool,
    pub state_change: bool,
    pub comment: bool,
    pub mention: bool,
    pub issue_completed: bool,
}

impl Default for NotificationPreference {
    fn default() -> Self {
        Self {
            property_change: true,
            state_change: true,
            comment: true,
            mention: true,
            issue_completed: true,
        }
    }
}

/// What kind of change an email would report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCategory {
    /// A state transition; `completes` is set when the new state is in the
    /// `completed` group.
    State { completes: bool },
    Comment,
    Mention,
    Property,
}

impl ChangeCategory {
    /// Categorise an activity by its field name.
    pub fn of(field: Option<&str>, completes: bool) -> Self {
        match field {
            Some(FIELD_STATE) => Self::State { completes },
            Some(FIELD_COMMENT) => Self::Comment,
            Some(FIELD_MENTION) => Self::Mention,
            _ => Self::Property,
        }
    }
}

impl NotificationPreference {
    /// Whether an email log row should be written for a change of `category`.
    ///
    /// A state change into a completed state is open when either
    /// `state_change` or `issue_completed` is set.
    pub fn allows_email(&self, category: ChangeCategory) -> bool {
        match category {
            ChangeCategory::State { completes } => {
                self.state_change || (completes && self.issue_completed)
            }
            ChangeCategory::Comment => self.comment,
            ChangeCategory::Mention => self.mention,
            ChangeCategory::Property => self.property_change,
        }
    }
}
