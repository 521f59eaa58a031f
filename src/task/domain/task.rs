//! Task aggregate root.

use super::{ActorId, Assignee, TaskDomainError, TaskId, TaskPath, ViewerGrant, WorkflowStateId};
use crate::directory::domain::WorkspaceId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    workspace_id: WorkspaceId,
    title: String,
    assignee: Option<Assignee>,
    viewers: Vec<ViewerGrant>,
    path: TaskPath,
    workflow_state_id: WorkflowStateId,
    archived: bool,
    subtask_count: u32,
    created_by: ActorId,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    revision: u64,
}

/// Parameter object for creating a task.
///
/// The path must already have been computed by the path manager; its final
/// segment is the new task's identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Ancestry path ending with the new task's identifier.
    pub path: TaskPath,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Task title.
    pub title: String,
    /// Resolved assignee, if any.
    pub assignee: Option<Assignee>,
    /// Viewer grants.
    pub viewers: Vec<ViewerGrant>,
    /// Initial workflow state.
    pub workflow_state_id: WorkflowStateId,
    /// Creating actor.
    pub created_by: ActorId,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted workspace.
    pub workspace_id: WorkspaceId,
    /// Persisted title.
    pub title: String,
    /// Persisted assignee.
    pub assignee: Option<Assignee>,
    /// Persisted viewer grants.
    pub viewers: Vec<ViewerGrant>,
    /// Persisted ancestry path.
    pub path: TaskPath,
    /// Persisted workflow state.
    pub workflow_state_id: WorkflowStateId,
    /// Persisted archive flag.
    pub archived: bool,
    /// Persisted number of live subtasks.
    pub subtask_count: u32,
    /// Persisted creator.
    pub created_by: ActorId,
    /// Persisted soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted mutation counter.
    pub revision: u64,
}

impl Task {
    /// Creates a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] for a blank title.
    pub fn create(new_task: NewTask, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        let NewTask {
            path,
            workspace_id,
            title,
            assignee,
            viewers,
            workflow_state_id,
            created_by,
        } = new_task;
        let title = normalize_title(&title)?;
        let id = path.task_id();
        let timestamp = clock.utc();

        Ok(Self {
            id,
            workspace_id,
            title,
            assignee,
            viewers: dedup_viewers(viewers),
            path,
            workflow_state_id,
            archived: false,
            subtask_count: 0,
            created_by,
            deleted_at: None,
            created_at: timestamp,
            updated_at: timestamp,
            revision: 0,
        })
    }

    /// Reconstructs a task from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::PathMismatch`] when the stored path does
    /// not end with the stored identifier.
    pub fn from_persisted(data: PersistedTaskData) -> Result<Self, TaskDomainError> {
        if data.path.task_id() != data.id {
            return Err(TaskDomainError::PathMismatch(data.id));
        }
        Ok(Self {
            id: data.id,
            workspace_id: data.workspace_id,
            title: data.title,
            assignee: data.assignee,
            viewers: data.viewers,
            path: data.path,
            workflow_state_id: data.workflow_state_id,
            archived: data.archived,
            subtask_count: data.subtask_count,
            created_by: data.created_by,
            deleted_at: data.deleted_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
            revision: data.revision,
        })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning workspace.
    #[must_use]
    pub const fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    /// Returns the parent task identifier, if any.
    #[must_use]
    pub fn parent_id(&self) -> Option<TaskId> {
        self.path.parent_id()
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assignee(&self) -> Option<&Assignee> {
        self.assignee.as_ref()
    }

    /// Returns the viewer grants.
    #[must_use]
    pub fn viewers(&self) -> &[ViewerGrant] {
        &self.viewers
    }

    /// Returns the ancestry path.
    #[must_use]
    pub const fn path(&self) -> &TaskPath {
        &self.path
    }

    /// Returns the workflow state.
    #[must_use]
    pub const fn workflow_state_id(&self) -> WorkflowStateId {
        self.workflow_state_id
    }

    /// Returns `true` when archived.
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived
    }

    /// Returns the number of live subtasks.
    #[must_use]
    pub const fn subtask_count(&self) -> u32 {
        self.subtask_count
    }

    /// Returns the creating actor.
    #[must_use]
    pub const fn created_by(&self) -> ActorId {
        self.created_by
    }

    /// Returns the soft-delete marker.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns `true` when soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the mutation counter, bumped by every change.
    ///
    /// Storage refuses a write planned against an older revision.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Renames the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] for a blank title.
    pub fn rename(&mut self, title: &str, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.title = normalize_title(title)?;
        self.touch(clock);
        Ok(())
    }

    /// Replaces the assignee.
    pub fn reassign(&mut self, assignee: Option<Assignee>, clock: &impl Clock) {
        self.assignee = assignee;
        self.touch(clock);
    }

    /// Moves the task to another workflow state.
    pub fn set_workflow_state(&mut self, workflow_state_id: WorkflowStateId, clock: &impl Clock) {
        self.workflow_state_id = workflow_state_id;
        self.touch(clock);
    }

    /// Archives or restores the task.
    pub fn set_archived(&mut self, archived: bool, clock: &impl Clock) {
        self.archived = archived;
        self.touch(clock);
    }

    /// Replaces the viewer grants.
    pub fn replace_viewers(&mut self, viewers: Vec<ViewerGrant>, clock: &impl Clock) {
        self.viewers = dedup_viewers(viewers);
        self.touch(clock);
    }

    /// Soft-deletes the task. Deleting twice keeps the first marker.
    pub fn mark_deleted(&mut self, clock: &impl Clock) {
        if self.deleted_at.is_none() {
            let timestamp = clock.utc();
            self.deleted_at = Some(timestamp);
            self.updated_at = timestamp;
            self.revision = self.revision.saturating_add(1);
        }
    }

    pub(crate) fn increment_subtasks(&mut self) {
        self.subtask_count = self.subtask_count.saturating_add(1);
    }

    pub(crate) fn decrement_subtasks(&mut self) {
        self.subtask_count = self.subtask_count.saturating_sub(1);
    }

    /// Adopts the stored counter, which only storage maintains.
    pub(crate) fn adopt_subtask_count(&mut self, subtask_count: u32) {
        self.subtask_count = subtask_count;
    }

    /// Stamps the current clock time and bumps the revision.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
        self.revision = self.revision.saturating_add(1);
    }
}

fn normalize_title(title: &str) -> Result<String, TaskDomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskDomainError::EmptyTitle);
    }
    Ok(trimmed.to_owned())
}

fn dedup_viewers(mut viewers: Vec<ViewerGrant>) -> Vec<ViewerGrant> {
    viewers.sort_unstable();
    viewers.dedup();
    viewers
}
