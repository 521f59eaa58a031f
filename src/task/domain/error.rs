//! Error types for task domain validation and parsing.

use super::TaskId;
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// More than one assignee shape was supplied.
    #[error("assignee must be exactly one of internal user, client with company, or company")]
    AmbiguousAssignee,

    /// A client assignee was supplied without the company it acts for.
    #[error("client assignee requires a company")]
    ClientWithoutCompany,

    /// A task path does not end with the task's own identifier.
    #[error("path of task {0} does not end with its own identifier")]
    PathMismatch(TaskId),
}

/// Error returned while parsing workflow state types from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown workflow state type: {0}")]
pub struct ParseWorkflowStateTypeError(pub String);

/// Error returned while parsing an encoded task path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid task path: {0}")]
pub struct ParseTaskPathError(pub String);

/// Error returned while parsing an identity kind from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {field}: {value}")]
pub struct ParseKindError {
    /// Name of the persisted field.
    pub field: &'static str,
    /// Unrecognised value.
    pub value: String,
}
