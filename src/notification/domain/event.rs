//! Task lifecycle events consumed by the reconciler.

use crate::task::domain::{Assignee, Task, WorkflowStateType};

/// A task paired with the category of its workflow state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Task state at the snapshot.
    pub task: Task,
    /// Category of the task's workflow state at the snapshot.
    pub state_type: WorkflowStateType,
}

impl TaskSnapshot {
    /// Captures a task and its workflow category.
    #[must_use]
    pub const fn new(task: Task, state_type: WorkflowStateType) -> Self {
        Self { task, state_type }
    }

    /// Returns `true` when the workflow state is in the completed category.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.state_type.is_completed()
    }

    /// Returns `true` when archived.
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.task.is_archived()
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assignee(&self) -> Option<&Assignee> {
        self.task.assignee()
    }
}

/// A committed task mutation, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskLifecycleEvent {
    /// A task was created.
    Created(TaskSnapshot),
    /// Assignment, workflow state, archive flag, or title changed.
    Updated {
        /// State before the mutation.
        before: TaskSnapshot,
        /// State after the mutation.
        after: TaskSnapshot,
    },
    /// A task and its descendants were soft-deleted.
    Deleted {
        /// The deleted task.
        task: Task,
        /// Descendants deleted with it.
        descendants: Vec<Task>,
    },
}

impl TaskLifecycleEvent {
    /// The task the event is about.
    #[must_use]
    pub const fn task(&self) -> &Task {
        match self {
            Self::Created(snapshot) | Self::Updated { after: snapshot, .. } => &snapshot.task,
            Self::Deleted { task, .. } => task,
        }
    }
}
