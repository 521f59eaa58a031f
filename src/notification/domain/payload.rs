//! Notification content handed to the platform.

use super::NotificationKind;
use crate::directory::domain::WorkspaceId;
use crate::task::domain::{ActorId, TaskId};
use serde::{Deserialize, Serialize};

/// Content of one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Reason for the notification.
    pub kind: NotificationKind,
    /// Workspace owning the task.
    pub workspace_id: WorkspaceId,
    /// Task the notification concerns.
    pub task_id: TaskId,
    /// Task title at the time of the mutation.
    pub title: String,
    /// Actor whose mutation triggered the notification.
    pub actor: ActorId,
}
