//! Task lifecycle orchestration: create, update, delete, and reads.

use super::{
    AssignmentResolver, NotFoundTarget, PathManager, TaskServiceError, TaskServiceResult,
};
use crate::config::EngineConfig;
use crate::directory::{
    domain::{ClientId, CompanyId, WorkspaceId},
    ports::IdentityDirectory,
};
use crate::notification::{
    domain::{LedgerEntry, Recipient, RetireMode, RetireScope, TaskLifecycleEvent, TaskSnapshot},
    ports::NotificationPlatform,
    services::{NotificationReconciler, ReconcileReport, RetireOutcome},
};
use crate::task::{
    domain::{
        Actor, ActorRole, AssigneeFields, NewTask, Task, TaskId, ViewerGrant, WorkflowState,
        WorkflowStateId,
    },
    ports::{CommitGuard, TaskRepositoryError, TaskStore, TaskWrite, TaskWriteBatch},
};
use crate::visibility::{VisibilityOptions, build_predicate, is_visible};
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    title: String,
    workflow_state_id: WorkflowStateId,
    parent_id: Option<TaskId>,
    assignee: AssigneeFields,
    viewers: Vec<ViewerGrant>,
}

impl CreateTaskRequest {
    /// Creates an unassigned top-level task request.
    #[must_use]
    pub fn new(title: impl Into<String>, workflow_state_id: WorkflowStateId) -> Self {
        Self {
            title: title.into(),
            workflow_state_id,
            parent_id: None,
            assignee: AssigneeFields::unassigned(),
            viewers: Vec::new(),
        }
    }

    /// Nests the task under a parent.
    #[must_use]
    pub const fn with_parent(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the raw assignee fields.
    #[must_use]
    pub const fn with_assignee(mut self, assignee: AssigneeFields) -> Self {
        self.assignee = assignee;
        self
    }

    /// Shares the task beyond its assignee.
    #[must_use]
    pub fn with_viewers(mut self, viewers: impl IntoIterator<Item = ViewerGrant>) -> Self {
        self.viewers = viewers.into_iter().collect();
        self
    }
}

/// Request payload for updating a task. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    title: Option<String>,
    assignee: Option<AssigneeFields>,
    workflow_state_id: Option<WorkflowStateId>,
    archived: Option<bool>,
    viewers: Option<Vec<ViewerGrant>>,
}

impl UpdateTaskRequest {
    /// Creates a request that changes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the task.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Reassigns the task. [`AssigneeFields::unassigned`] clears it.
    #[must_use]
    pub const fn with_assignee(mut self, assignee: AssigneeFields) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Moves the task to another workflow state.
    #[must_use]
    pub const fn with_workflow_state(mut self, workflow_state_id: WorkflowStateId) -> Self {
        self.workflow_state_id = Some(workflow_state_id);
        self
    }

    /// Archives or restores the task.
    #[must_use]
    pub const fn with_archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    /// Replaces the viewer grants.
    #[must_use]
    pub fn with_viewers(mut self, viewers: impl IntoIterator<Item = ViewerGrant>) -> Self {
        self.viewers = Some(viewers.into_iter().collect());
        self
    }
}

/// A committed mutation and the notification work it triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMutation {
    /// The task as stored after the mutation.
    pub task: Task,
    /// Notification side effects, which never fail the mutation.
    pub notifications: ReconcileReport,
}

/// Task lifecycle orchestration service.
///
/// Every mutation resolves its inputs, plans notification effects, commits
/// one write batch, and only then talks to the notification platform.
#[derive(Clone)]
pub struct TaskService<S, P, D, C>
where
    S: TaskStore,
    P: NotificationPlatform,
    D: IdentityDirectory,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    paths: PathManager<S>,
    assignments: AssignmentResolver<D>,
    reconciler: NotificationReconciler<S, P, D, C>,
    clock: Arc<C>,
    commit_attempts: u32,
}

impl<S, P, D, C> TaskService<S, P, D, C>
where
    S: TaskStore,
    P: NotificationPlatform,
    D: IdentityDirectory,
    C: Clock + Send + Sync,
{
    /// Creates a task service.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        platform: Arc<P>,
        clock: Arc<C>,
        config: EngineConfig,
    ) -> Self {
        let paths = PathManager::new(Arc::clone(&store), config.max_subtask_depth);
        let commit_attempts = config.commit_attempts.max(1);
        let assignments = AssignmentResolver::new(Arc::clone(&directory), config.directory_retry);
        let reconciler = NotificationReconciler::new(
            Arc::clone(&store),
            platform,
            directory,
            Arc::clone(&clock),
            config,
        );
        Self {
            store,
            paths,
            assignments,
            reconciler,
            clock,
            commit_attempts,
        }
    }

    /// The path manager used by this service.
    #[must_use]
    pub const fn paths(&self) -> &PathManager<S> {
        &self.paths
    }

    /// Creates a task, optionally nested under a parent.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] for an unknown workflow state or
    /// parent, [`TaskServiceError::DepthExceeded`],
    /// [`TaskServiceError::InvalidAssignee`],
    /// [`TaskServiceError::TransientDependencyFailure`], or a domain or
    /// storage error. Nothing is written when an error is returned.
    pub async fn create_task(
        &self,
        actor: &Actor,
        request: CreateTaskRequest,
    ) -> TaskServiceResult<TaskMutation> {
        let workspace_id = actor.workspace_id();
        let CreateTaskRequest {
            title,
            workflow_state_id,
            parent_id,
            assignee,
            viewers,
        } = request;

        let workflow_state = self.workflow_state(workspace_id, workflow_state_id).await?;
        let resolved_assignee = self.assignments.resolve(workspace_id, assignee).await?;
        let resolved_viewers = self
            .assignments
            .resolve_viewers(workspace_id, viewers)
            .await?;
        let path = self
            .paths
            .compute_path(workspace_id, TaskId::new(), parent_id)
            .await?;

        let task = Task::create(
            NewTask {
                path,
                workspace_id,
                title,
                assignee: resolved_assignee,
                viewers: resolved_viewers,
                workflow_state_id,
                created_by: actor.id(),
            },
            &*self.clock,
        )?;

        let event =
            TaskLifecycleEvent::Created(TaskSnapshot::new(task.clone(), workflow_state.state_type));
        let plan = self.reconciler.plan(&event, actor.id()).await?;
        self.store
            .commit(
                TaskWriteBatch::new(TaskWrite::Insert(task.clone()))
                    .with_ledger_removals(plan.ledger_removals()),
            )
            .await?;
        info!(
            task_id = %task.id(),
            %workspace_id,
            depth = task.path().depth(),
            "created task"
        );

        let notifications = self.reconciler.execute(&plan).await;
        Ok(TaskMutation {
            task,
            notifications,
        })
    }

    /// Applies title, assignee, workflow, archive, and viewer changes as one
    /// mutation.
    ///
    /// Fields equal to the stored values are ignored; a request that changes
    /// nothing writes nothing and notifies nobody. When a concurrent mutation
    /// of the same task commits first, the update is re-planned against the
    /// new stored state.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`], [`TaskServiceError::Unauthorized`],
    /// [`TaskServiceError::InvalidAssignee`],
    /// [`TaskServiceError::TransientDependencyFailure`],
    /// [`TaskServiceError::ConcurrentModification`], or a domain or storage
    /// error. Nothing is written when an error is returned.
    pub async fn update_task(
        &self,
        actor: &Actor,
        task_id: TaskId,
        request: UpdateTaskRequest,
    ) -> TaskServiceResult<TaskMutation> {
        self.replanning_on_conflict(task_id, || self.try_update(actor, task_id, &request))
            .await
    }

    /// Soft-deletes a task and every live descendant, purging their ledger
    /// entries.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`], [`TaskServiceError::Unauthorized`],
    /// [`TaskServiceError::ConcurrentModification`], or a storage error.
    pub async fn delete_task(
        &self,
        actor: &Actor,
        task_id: TaskId,
    ) -> TaskServiceResult<TaskMutation> {
        self.replanning_on_conflict(task_id, || self.try_delete(actor, task_id))
            .await
    }

    async fn try_update(
        &self,
        actor: &Actor,
        task_id: TaskId,
        request: &UpdateTaskRequest,
    ) -> TaskServiceResult<TaskMutation> {
        let workspace_id = actor.workspace_id();
        let before = self.visible_task(actor, task_id).await?;
        let before_state = self
            .workflow_state(workspace_id, before.workflow_state_id())
            .await?;
        let mut after = before.clone();
        let mut after_state = before_state.clone();
        let mut changed = false;

        if let Some(title) = &request.title {
            if title.trim() != after.title() {
                after.rename(title, &*self.clock)?;
                changed = true;
            }
        }
        if let Some(fields) = request.assignee {
            let assignee = self.assignments.resolve(workspace_id, fields).await?;
            if assignee.as_ref() != after.assignee() {
                after.reassign(assignee, &*self.clock);
                changed = true;
            }
        }
        if let Some(workflow_state_id) = request.workflow_state_id {
            if workflow_state_id != after.workflow_state_id() {
                after_state = self.workflow_state(workspace_id, workflow_state_id).await?;
                after.set_workflow_state(workflow_state_id, &*self.clock);
                changed = true;
            }
        }
        if let Some(archived) = request.archived {
            if archived != after.is_archived() {
                after.set_archived(archived, &*self.clock);
                changed = true;
            }
        }
        if let Some(viewers) = &request.viewers {
            let mut resolved = self
                .assignments
                .resolve_viewers(workspace_id, viewers.clone())
                .await?;
            resolved.sort_unstable();
            resolved.dedup();
            if resolved.as_slice() != after.viewers() {
                after.replace_viewers(resolved, &*self.clock);
                changed = true;
            }
        }

        if !changed {
            return Ok(TaskMutation {
                task: before,
                notifications: ReconcileReport::default(),
            });
        }

        let stored_revision = before.revision();
        let event = TaskLifecycleEvent::Updated {
            before: TaskSnapshot::new(before, before_state.state_type),
            after: TaskSnapshot::new(after.clone(), after_state.state_type),
        };
        let plan = self.reconciler.plan(&event, actor.id()).await?;
        self.store
            .commit(
                TaskWriteBatch::new(TaskWrite::Update(after.clone()))
                    .with_ledger_removals(plan.ledger_removals())
                    .with_guard(CommitGuard::new(
                        stored_revision,
                        plan.observed().iter().copied(),
                    )),
            )
            .await?;
        info!(
            task_id = %after.id(),
            %workspace_id,
            workflow_state = after_state.state_type.as_str(),
            archived = after.is_archived(),
            revision = after.revision(),
            "updated task"
        );

        let notifications = self.reconciler.execute(&plan).await;
        Ok(TaskMutation {
            task: after,
            notifications,
        })
    }

    async fn try_delete(&self, actor: &Actor, task_id: TaskId) -> TaskServiceResult<TaskMutation> {
        let mut task = self.visible_task(actor, task_id).await?;
        let stored_revision = task.revision();
        let mut descendants = self.paths.descendants(&task).await?;
        task.mark_deleted(&*self.clock);
        for descendant in &mut descendants {
            descendant.mark_deleted(&*self.clock);
        }

        let event = TaskLifecycleEvent::Deleted {
            task: task.clone(),
            descendants: descendants.clone(),
        };
        let plan = self.reconciler.plan(&event, actor.id()).await?;
        let cascaded = descendants.len();
        self.store
            .commit(
                TaskWriteBatch::new(TaskWrite::Delete(task.clone()))
                    .with_deleted_descendants(descendants)
                    .with_ledger_removals(plan.ledger_removals())
                    .with_guard(CommitGuard::new(
                        stored_revision,
                        plan.observed().iter().copied(),
                    )),
            )
            .await?;
        info!(
            %task_id,
            workspace_id = %task.workspace_id(),
            cascaded,
            "deleted task"
        );

        let notifications = self.reconciler.execute(&plan).await;
        Ok(TaskMutation {
            task,
            notifications,
        })
    }

    /// Runs a plan-and-commit attempt, starting over from a fresh read when
    /// the commit reports that the task moved on underneath it.
    async fn replanning_on_conflict<F, Fut>(
        &self,
        task_id: TaskId,
        mut attempt_mutation: F,
    ) -> TaskServiceResult<TaskMutation>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TaskServiceResult<TaskMutation>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match attempt_mutation().await {
                Err(TaskServiceError::Repository(TaskRepositoryError::Conflict(_)))
                    if attempt < self.commit_attempts =>
                {
                    debug!(%task_id, attempt, "task changed concurrently, re-planning");
                    attempt = attempt.saturating_add(1);
                }
                Err(TaskServiceError::Repository(TaskRepositoryError::Conflict(_))) => {
                    warn!(%task_id, attempt, "giving up on a contended task mutation");
                    return Err(TaskServiceError::ConcurrentModification(task_id));
                }
                outcome => return outcome,
            }
        }
    }

    /// Fetches a task the actor may see.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] for a missing or deleted task
    /// and [`TaskServiceError::Unauthorized`] when it is invisible to the
    /// actor.
    pub async fn get_task(&self, actor: &Actor, task_id: TaskId) -> TaskServiceResult<Task> {
        self.visible_task(actor, task_id).await
    }

    /// Lists the tasks visible to the actor, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Repository`] when the query fails.
    pub async fn list_tasks(
        &self,
        actor: &Actor,
        options: &VisibilityOptions,
    ) -> TaskServiceResult<Vec<Task>> {
        let predicate = build_predicate(actor, options);
        Ok(self.store.query(&predicate).await?)
    }

    /// Breadcrumb trail of a task the actor may see. Ancestors invisible to
    /// the actor are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`], [`TaskServiceError::Unauthorized`],
    /// or a storage error.
    pub async fn ancestors(&self, actor: &Actor, task_id: TaskId) -> TaskServiceResult<Vec<Task>> {
        let task = self.visible_task(actor, task_id).await?;
        self.paths.visible_ancestors(actor, &task).await
    }

    /// Workflow states of the actor's workspace, by name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Repository`] when the lookup fails.
    pub async fn list_workflow_states(
        &self,
        actor: &Actor,
    ) -> TaskServiceResult<Vec<WorkflowState>> {
        Ok(self.store.list_workflow_states(actor.workspace_id()).await?)
    }

    /// Notifications the actor still holds unread, oldest first.
    ///
    /// A client only sees what it holds on behalf of the company it is
    /// acting for.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Ledger`] when the ledger cannot be read.
    pub async fn outstanding_notifications(
        &self,
        actor: &Actor,
    ) -> TaskServiceResult<Vec<LedgerEntry>> {
        let recipient = match *actor.role() {
            ActorRole::InternalUser {
                internal_user_id, ..
            } => Recipient::internal_user(internal_user_id),
            ActorRole::Client {
                client_id,
                company_id: Some(company_id),
            } => Recipient::client(client_id, company_id),
            ActorRole::Client {
                company_id: None, ..
            } => return Ok(Vec::new()),
        };
        Ok(self
            .reconciler
            .ledger()
            .find_by_recipients(&[recipient])
            .await?)
    }

    /// Withdraws what the listed clients hold on behalf of a company that no
    /// longer grants them access, across every task.
    ///
    /// Platform failures are counted in the outcome; the local rows are
    /// removed regardless.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::CompanyAccessDenied`] unless the actor is
    /// staff whose access covers the company, or [`TaskServiceError::Ledger`]
    /// when the ledger cannot be updated.
    pub async fn withdraw_company_notifications(
        &self,
        actor: &Actor,
        company_id: CompanyId,
        clients: impl IntoIterator<Item = ClientId> + Send,
    ) -> TaskServiceResult<RetireOutcome> {
        let ActorRole::InternalUser { company_access, .. } = actor.role() else {
            return Err(TaskServiceError::CompanyAccessDenied(company_id));
        };
        if !company_access.covers(company_id) {
            return Err(TaskServiceError::CompanyAccessDenied(company_id));
        }
        let scope = RetireScope::CompanyRecipients {
            company_id,
            recipients: clients
                .into_iter()
                .map(|client_id| Recipient::client(client_id, company_id))
                .collect(),
        };
        let outcome = self
            .reconciler
            .ledger()
            .retire(&scope, RetireMode::MarkRead)
            .await?;
        info!(
            %company_id,
            retired = outcome.retired,
            platform_failures = outcome.platform_failures,
            "withdrew company notifications"
        );
        Ok(outcome)
    }

    async fn visible_task(&self, actor: &Actor, task_id: TaskId) -> TaskServiceResult<Task> {
        let task = self
            .store
            .find_by_id(task_id)
            .await?
            .filter(|task| task.workspace_id() == actor.workspace_id() && !task.is_deleted())
            .ok_or(TaskServiceError::NotFound(NotFoundTarget::Task(task_id)))?;
        if is_visible(actor, &task, &VisibilityOptions::default()) {
            Ok(task)
        } else {
            Err(TaskServiceError::Unauthorized(task_id))
        }
    }

    async fn workflow_state(
        &self,
        workspace_id: WorkspaceId,
        workflow_state_id: WorkflowStateId,
    ) -> TaskServiceResult<WorkflowState> {
        self.store
            .find_workflow_state(workflow_state_id)
            .await?
            .filter(|state| state.workspace_id == workspace_id)
            .ok_or(TaskServiceError::NotFound(NotFoundTarget::WorkflowState(
                workflow_state_id,
            )))
    }
}
