//! Ledger rows correlating external notifications with local state.

use super::{ExternalNotificationId, LedgerEntryId, Recipient};
use crate::task::domain::{ParseKindError, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a notification was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The recipient became responsible for the task.
    Assigned,
    /// The task the recipient follows was completed.
    Completed,
}

impl NotificationKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = ParseKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "assigned" => Ok(Self::Assigned),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseKindError {
                field: "notification kind",
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outstanding notification.
///
/// At most one entry exists per (recipient, task) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Row identifier.
    pub id: LedgerEntryId,
    /// Notified individual.
    pub recipient: Recipient,
    /// Task the notification concerns.
    pub task_id: TaskId,
    /// Identifier returned by the notification platform.
    pub external_id: ExternalNotificationId,
    /// Reason for the notification.
    pub kind: NotificationKind,
    /// Time the entry was recorded.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Records a freshly issued notification.
    #[must_use]
    pub fn issued(
        recipient: Recipient,
        task_id: TaskId,
        external_id: ExternalNotificationId,
        kind: NotificationKind,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            recipient,
            task_id,
            external_id,
            kind,
            created_at: clock.utc(),
        }
    }

    /// Returns `true` when the entry occupies the (recipient, task) slot.
    #[must_use]
    pub fn occupies(&self, recipient: &Recipient, task_id: TaskId) -> bool {
        self.task_id == task_id && self.recipient.recipient_id() == recipient.recipient_id()
    }
}
