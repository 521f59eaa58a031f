//! Repository port for task persistence and visibility-scoped lookup.

use crate::notification::domain::LedgerEntryId;
use crate::task::domain::{Task, TaskId, TaskPath};
use crate::visibility::TaskPredicate;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Row-level write carried by a [`TaskWriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskWrite {
    /// Inserts a new task, including its path, and increments the parent's
    /// subtask counter.
    Insert(Task),
    /// Updates mutable task fields. The stored path is never rewritten.
    Update(Task),
    /// Persists a soft-deleted task and decrements the parent's subtask
    /// counter.
    Delete(Task),
}

impl TaskWrite {
    /// The task being written.
    #[must_use]
    pub const fn task(&self) -> &Task {
        match self {
            Self::Insert(task) | Self::Update(task) | Self::Delete(task) => task,
        }
    }
}

/// Stored state a batch was planned against.
///
/// A guarded commit fails with [`TaskRepositoryError::Conflict`] unless the
/// written task is still at `revision` and the ledger rows held for the
/// guarded tasks are exactly `outstanding`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitGuard {
    /// Revision of the stored task when the batch was planned.
    pub revision: u64,
    /// Ledger rows observed for the task and its deleted descendants.
    pub outstanding: BTreeSet<LedgerEntryId>,
}

impl CommitGuard {
    /// Guards a write planned against the stored `revision` and the ledger
    /// rows read alongside it.
    #[must_use]
    pub fn new(revision: u64, outstanding: impl IntoIterator<Item = LedgerEntryId>) -> Self {
        Self {
            revision,
            outstanding: outstanding.into_iter().collect(),
        }
    }

    /// Returns `true` when the stored revision and ledger rows still match.
    #[must_use]
    pub fn holds<'a>(
        &self,
        stored_revision: u64,
        stored_outstanding: impl IntoIterator<Item = &'a LedgerEntryId>,
    ) -> bool {
        stored_revision == self.revision
            && stored_outstanding
                .into_iter()
                .copied()
                .collect::<BTreeSet<_>>()
                == self.outstanding
    }
}

/// Everything one task mutation commits in a single storage transaction.
///
/// The batch is an explicit value handed to [`TaskRepository::commit`];
/// services never hold an open transaction between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskWriteBatch {
    /// Primary task write.
    pub write: TaskWrite,
    /// Descendants soft-deleted alongside a deleted task.
    pub deleted_descendants: Vec<Task>,
    /// Ledger rows retired by this mutation.
    pub ledger_removals: Vec<LedgerEntryId>,
    /// Optimistic concurrency check for updates and deletes.
    pub guard: Option<CommitGuard>,
}

impl TaskWriteBatch {
    /// A batch carrying only the task write.
    #[must_use]
    pub const fn new(write: TaskWrite) -> Self {
        Self {
            write,
            deleted_descendants: Vec::new(),
            ledger_removals: Vec::new(),
            guard: None,
        }
    }

    /// Adds soft-deleted descendants.
    #[must_use]
    pub fn with_deleted_descendants(mut self, descendants: Vec<Task>) -> Self {
        self.deleted_descendants = descendants;
        self
    }

    /// Adds ledger rows to remove.
    #[must_use]
    pub fn with_ledger_removals(mut self, removals: Vec<LedgerEntryId>) -> Self {
        self.ledger_removals = removals;
        self
    }

    /// Refuses the batch if the stored task or its ledger rows moved on.
    #[must_use]
    pub fn with_guard(mut self, guard: CommitGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Tasks whose ledger rows the guard covers.
    #[must_use]
    pub fn guarded_tasks(&self) -> Vec<TaskId> {
        std::iter::once(self.write.task().id())
            .chain(self.deleted_descendants.iter().map(Task::id))
            .collect()
    }
}

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Applies a write batch atomically.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when inserting an
    /// existing identifier, [`TaskRepositoryError::NotFound`] when updating
    /// or deleting a missing task, and [`TaskRepositoryError::Conflict`] when
    /// the batch's guard no longer holds. Nothing is written on error.
    async fn commit(&self, batch: TaskWriteBatch) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier, including soft-deleted tasks.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Finds the tasks with the given identifiers. Missing identifiers are
    /// skipped; order follows the input.
    async fn find_many(&self, ids: &[TaskId]) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns the tasks matching a predicate, oldest first.
    ///
    /// [`TaskPredicate::Parent`] clauses are evaluated against each task's
    /// immediate parent.
    async fn query(&self, predicate: &TaskPredicate) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns every live task below the path, oldest first.
    async fn find_descendants(&self, path: &TaskPath) -> TaskRepositoryResult<Vec<Task>>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The task or its ledger rows changed after the batch was planned.
    #[error("task {0} changed concurrently")]
    Conflict(TaskId),

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt task row {task_id}: {reason}")]
    CorruptRow {
        /// Offending row.
        task_id: uuid::Uuid,
        /// Decoding failure.
        reason: String,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
