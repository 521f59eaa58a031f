//! Errors surfaced by task services.

use crate::directory::{domain::CompanyId, ports::DirectoryError};
use crate::notification::ports::NotificationLedgerError;
use crate::task::{
    domain::{TaskDomainError, TaskId, WorkflowStateId},
    ports::TaskRepositoryError,
};
use std::fmt;
use thiserror::Error;

/// What a not-found error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundTarget {
    /// The task being read or mutated.
    Task(TaskId),
    /// The parent named for a new subtask.
    ParentTask(TaskId),
    /// A workflow state in the task's workspace.
    WorkflowState(WorkflowStateId),
}

impl fmt::Display for NotFoundTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => write!(f, "task {id}"),
            Self::ParentTask(id) => write!(f, "parent task {id}"),
            Self::WorkflowState(id) => write!(f, "workflow state {id}"),
        }
    }
}

/// Service-level errors for task operations.
///
/// Every variant is raised before the task mutation commits, so none of them
/// leaves partial side effects behind.
#[derive(Debug, Error)]
pub enum TaskServiceError {
    /// A referenced record does not exist, is deleted, or lives in another
    /// workspace.
    #[error("{0} not found")]
    NotFound(NotFoundTarget),

    /// The assignee or a viewer grant does not resolve to a valid identity.
    #[error("invalid assignee: {0}")]
    InvalidAssignee(String),

    /// The new subtask would be nested too deeply.
    #[error("subtask depth {depth} exceeds the maximum of {max}")]
    DepthExceeded {
        /// Depth the new task would have.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The actor may not see the task.
    #[error("task {0} is not visible to the actor")]
    Unauthorized(TaskId),

    /// The actor may not manage the company's notifications.
    #[error("company {0} is outside the actor's access")]
    CompanyAccessDenied(CompanyId),

    /// Concurrent mutations of the task kept invalidating this one.
    #[error("task {0} kept changing concurrently; giving up")]
    ConcurrentModification(TaskId),

    /// The identity directory stayed unavailable after retries.
    #[error("identity directory unavailable: {0}")]
    TransientDependencyFailure(DirectoryError),

    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// Task storage failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),

    /// Notification ledger storage failed while planning.
    #[error(transparent)]
    Ledger(#[from] NotificationLedgerError),
}

/// Result type for task service operations.
pub type TaskServiceResult<T> = Result<T, TaskServiceError>;
