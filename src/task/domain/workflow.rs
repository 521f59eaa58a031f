//! Workspace workflow states.

use super::{ParseWorkflowStateTypeError, WorkflowStateId};
use crate::directory::domain::WorkspaceId;
use serde::{Deserialize, Serialize};

/// Category of a workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStateType {
    /// Parked, not yet planned.
    Backlog,
    /// Planned but not started.
    Unstarted,
    /// In progress.
    Started,
    /// Done.
    Completed,
    /// Abandoned.
    Cancelled,
}

impl WorkflowStateType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Unstarted => "unstarted",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` for the completed category.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl TryFrom<&str> for WorkflowStateType {
    type Error = ParseWorkflowStateTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "backlog" => Ok(Self::Backlog),
            "unstarted" => Ok(Self::Unstarted),
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseWorkflowStateTypeError(value.to_owned())),
        }
    }
}

/// Workspace-scoped workflow state configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// State identifier.
    pub id: WorkflowStateId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Display name.
    pub name: String,
    /// Category driving notification behaviour.
    pub state_type: WorkflowStateType,
}

impl WorkflowState {
    /// Creates a workflow state with a fresh identifier.
    #[must_use]
    pub fn new(
        workspace_id: WorkspaceId,
        name: impl Into<String>,
        state_type: WorkflowStateType,
    ) -> Self {
        Self {
            id: WorkflowStateId::new(),
            workspace_id,
            name: name.into(),
            state_type,
        }
    }
}
