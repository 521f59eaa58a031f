//! Port contracts for task storage.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.
//! [`TaskStore`] bundles every table a task mutation touches so one adapter
//! can commit task rows and ledger rows in the same transaction.

pub mod repository;
pub mod workflow;

pub use repository::{
    CommitGuard, TaskRepository, TaskRepositoryError, TaskRepositoryResult, TaskWrite,
    TaskWriteBatch,
};
pub use workflow::WorkflowStateRepository;

use crate::notification::ports::NotificationLedgerRepository;

/// Storage backend covering tasks, workflow states, and the notification
/// ledger.
pub trait TaskStore:
    TaskRepository + WorkflowStateRepository + NotificationLedgerRepository
{
}

impl<T> TaskStore for T where
    T: TaskRepository + WorkflowStateRepository + NotificationLedgerRepository
{
}
