//! Ancestry path computation and traversal.

use super::{NotFoundTarget, TaskServiceError, TaskServiceResult};
use crate::directory::domain::WorkspaceId;
use crate::task::{
    domain::{Actor, Task, TaskId, TaskPath},
    ports::TaskRepository,
};
use crate::visibility::{VisibilityOptions, is_visible};
use std::sync::Arc;

/// Computes write-once task paths and resolves ancestor chains.
#[derive(Clone)]
pub struct PathManager<R>
where
    R: TaskRepository,
{
    repository: Arc<R>,
    max_depth: usize,
}

impl<R> PathManager<R>
where
    R: TaskRepository,
{
    /// Creates a path manager allowing at most `max_depth` ancestors.
    #[must_use]
    pub const fn new(repository: Arc<R>, max_depth: usize) -> Self {
        Self {
            repository,
            max_depth,
        }
    }

    /// Computes the path of a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] when the parent is missing,
    /// deleted, or in another workspace, and
    /// [`TaskServiceError::DepthExceeded`] when the new task would sit deeper
    /// than allowed.
    pub async fn compute_path(
        &self,
        workspace_id: WorkspaceId,
        task_id: TaskId,
        parent_id: Option<TaskId>,
    ) -> TaskServiceResult<TaskPath> {
        let Some(parent_id) = parent_id else {
            return Ok(TaskPath::root(task_id));
        };
        let parent = self
            .repository
            .find_by_id(parent_id)
            .await?
            .filter(|parent| parent.workspace_id() == workspace_id && !parent.is_deleted())
            .ok_or(TaskServiceError::NotFound(NotFoundTarget::ParentTask(
                parent_id,
            )))?;

        let path = parent.path().child(task_id);
        if path.depth() > self.max_depth {
            return Err(TaskServiceError::DepthExceeded {
                depth: path.depth(),
                max: self.max_depth,
            });
        }
        Ok(path)
    }

    /// Ancestor identifiers of a path, oldest first, self excluded.
    #[must_use]
    pub fn ancestor_ids(path: &TaskPath) -> &[TaskId] {
        path.ancestor_ids()
    }

    /// Number of ancestors of a path.
    #[must_use]
    pub fn depth(path: &TaskPath) -> usize {
        path.depth()
    }

    /// Breadcrumb trail for a task: ancestors the actor may see, oldest
    /// first. Invisible or deleted ancestors are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Repository`] when the lookup fails.
    pub async fn visible_ancestors(
        &self,
        actor: &Actor,
        task: &Task,
    ) -> TaskServiceResult<Vec<Task>> {
        let ancestors = self.repository.find_many(task.path().ancestor_ids()).await?;
        let options = VisibilityOptions::default();
        Ok(ancestors
            .into_iter()
            .filter(|ancestor| is_visible(actor, ancestor, &options))
            .collect())
    }

    /// Live descendants of a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Repository`] when the lookup fails.
    pub async fn descendants(&self, task: &Task) -> TaskServiceResult<Vec<Task>> {
        Ok(self.repository.find_descendants(task.path()).await?)
    }
}
