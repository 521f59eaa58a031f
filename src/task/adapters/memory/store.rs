//! In-memory task store for tests and local wiring.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::directory::domain::WorkspaceId;
use crate::notification::{
    domain::{LedgerEntry, LedgerEntryId, Recipient, RetireScope},
    ports::{NotificationLedgerError, NotificationLedgerRepository, NotificationLedgerResult},
};
use crate::task::{
    domain::{Task, TaskId, TaskPath, WorkflowState, WorkflowStateId},
    ports::{
        CommitGuard, TaskRepository, TaskRepositoryError, TaskRepositoryResult, TaskWrite,
        TaskWriteBatch, WorkflowStateRepository,
    },
};
use crate::visibility::TaskPredicate;

/// Thread-safe in-memory store backing every task storage port.
///
/// Tasks, workflow states, and ledger rows share one lock so a write batch
/// is applied atomically.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    tasks: HashMap<TaskId, Task>,
    workflow_states: HashMap<WorkflowStateId, WorkflowState>,
    ledger: Vec<LedgerEntry>,
}

fn poisoned(err: impl ToString) -> std::io::Error {
    std::io::Error::other(err.to_string())
}

fn oldest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a workflow state.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when lock acquisition
    /// fails.
    pub fn insert_workflow_state(&self, state: WorkflowState) -> TaskRepositoryResult<()> {
        self.write()?.workflow_states.insert(state.id, state);
        Ok(())
    }

    /// Returns every ledger row currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationLedgerError::Persistence`] when lock acquisition
    /// fails.
    pub fn ledger_snapshot(&self) -> NotificationLedgerResult<Vec<LedgerEntry>> {
        Ok(self.ledger_read()?.ledger.clone())
    }

    fn read(&self) -> TaskRepositoryResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|err| TaskRepositoryError::persistence(poisoned(err)))
    }

    fn write(&self) -> TaskRepositoryResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|err| TaskRepositoryError::persistence(poisoned(err)))
    }

    fn ledger_read(&self) -> NotificationLedgerResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|err| NotificationLedgerError::persistence(poisoned(err)))
    }

    fn ledger_write(&self) -> NotificationLedgerResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|err| NotificationLedgerError::persistence(poisoned(err)))
    }
}

impl StoreState {
    /// Rejects a batch that cannot be applied in full.
    fn validate(&self, batch: &TaskWriteBatch) -> TaskRepositoryResult<()> {
        match &batch.write {
            TaskWrite::Insert(task) => {
                if self.tasks.contains_key(&task.id()) {
                    return Err(TaskRepositoryError::DuplicateTask(task.id()));
                }
                if let Some(parent_id) = task.parent_id() {
                    if !self.tasks.contains_key(&parent_id) {
                        return Err(TaskRepositoryError::NotFound(parent_id));
                    }
                }
            }
            TaskWrite::Update(task) | TaskWrite::Delete(task) => {
                if !self.tasks.contains_key(&task.id()) {
                    return Err(TaskRepositoryError::NotFound(task.id()));
                }
            }
        }
        if let Some(missing) = batch
            .deleted_descendants
            .iter()
            .find(|task| !self.tasks.contains_key(&task.id()))
        {
            return Err(TaskRepositoryError::NotFound(missing.id()));
        }
        batch
            .guard
            .as_ref()
            .map_or(Ok(()), |guard| self.check_guard(batch, guard))
    }

    fn check_guard(
        &self,
        batch: &TaskWriteBatch,
        guard: &CommitGuard,
    ) -> TaskRepositoryResult<()> {
        let task_id = batch.write.task().id();
        let stored_revision = self.tasks.get(&task_id).map_or(0, Task::revision);
        let guarded = batch.guarded_tasks();
        let outstanding = self
            .ledger
            .iter()
            .filter(|entry| guarded.contains(&entry.task_id))
            .map(|entry| &entry.id);
        if guard.holds(stored_revision, outstanding) {
            Ok(())
        } else {
            Err(TaskRepositoryError::Conflict(task_id))
        }
    }

    fn replace_slot(&mut self, entry: LedgerEntry) -> Vec<LedgerEntry> {
        let (displaced, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.ledger)
            .into_iter()
            .partition(|existing| existing.occupies(&entry.recipient, entry.task_id));
        self.ledger = kept;
        self.ledger.push(entry);
        displaced
    }

    fn adjust_parent(&mut self, task: &Task, adjust: impl FnOnce(&mut Task)) {
        if let Some(parent) = task
            .parent_id()
            .and_then(|parent_id| self.tasks.get_mut(&parent_id))
        {
            adjust(parent);
        }
    }

    /// Stores a task over an existing row, keeping the stored counter.
    fn overwrite(&mut self, mut task: Task) {
        if let Some(stored) = self.tasks.get(&task.id()) {
            task.adopt_subtask_count(stored.subtask_count());
        }
        self.tasks.insert(task.id(), task);
    }

    fn apply(&mut self, batch: TaskWriteBatch) {
        let TaskWriteBatch {
            write,
            deleted_descendants,
            ledger_removals,
            ..
        } = batch;
        match write {
            TaskWrite::Insert(task) => {
                self.adjust_parent(&task, Task::increment_subtasks);
                self.tasks.insert(task.id(), task);
            }
            TaskWrite::Update(task) => self.overwrite(task),
            TaskWrite::Delete(task) => {
                let newly_deleted = self
                    .tasks
                    .get(&task.id())
                    .is_some_and(|stored| !stored.is_deleted());
                if newly_deleted {
                    self.adjust_parent(&task, Task::decrement_subtasks);
                }
                self.overwrite(task);
            }
        }
        for descendant in deleted_descendants {
            self.overwrite(descendant);
        }
        if !ledger_removals.is_empty() {
            let removals: BTreeSet<_> = ledger_removals.into_iter().collect();
            self.ledger.retain(|entry| !removals.contains(&entry.id));
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskStore {
    async fn commit(&self, batch: TaskWriteBatch) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        state.validate(&batch)?;
        state.apply(batch);
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[TaskId]) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.tasks.get(id).cloned())
            .collect())
    }

    async fn query(&self, predicate: &TaskPredicate) -> TaskRepositoryResult<Vec<Task>> {
        if predicate.is_nothing() {
            return Ok(Vec::new());
        }
        let state = self.read()?;
        let mut matched: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| {
                let parent = task
                    .parent_id()
                    .and_then(|parent_id| state.tasks.get(&parent_id));
                predicate.matches(task, parent)
            })
            .cloned()
            .collect();
        oldest_first(&mut matched);
        Ok(matched)
    }

    async fn find_descendants(&self, path: &TaskPath) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        let mut descendants: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| !task.is_deleted() && task.path().is_descendant_of(path))
            .cloned()
            .collect();
        oldest_first(&mut descendants);
        Ok(descendants)
    }
}

#[async_trait]
impl WorkflowStateRepository for InMemoryTaskStore {
    async fn find_workflow_state(
        &self,
        id: WorkflowStateId,
    ) -> TaskRepositoryResult<Option<WorkflowState>> {
        Ok(self.read()?.workflow_states.get(&id).cloned())
    }

    async fn list_workflow_states(
        &self,
        workspace_id: WorkspaceId,
    ) -> TaskRepositoryResult<Vec<WorkflowState>> {
        let state = self.read()?;
        let mut states: Vec<_> = state
            .workflow_states
            .values()
            .filter(|workflow_state| workflow_state.workspace_id == workspace_id)
            .cloned()
            .collect();
        states.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(states)
    }
}

#[async_trait]
impl NotificationLedgerRepository for InMemoryTaskStore {
    async fn replace_outstanding(
        &self,
        entry: LedgerEntry,
    ) -> NotificationLedgerResult<Vec<LedgerEntry>> {
        Ok(self.ledger_write()?.replace_slot(entry))
    }

    async fn replace_outstanding_if_current(
        &self,
        entry: LedgerEntry,
        revision: u64,
    ) -> NotificationLedgerResult<Option<Vec<LedgerEntry>>> {
        let mut state = self.ledger_write()?;
        let current = state
            .tasks
            .get(&entry.task_id)
            .is_some_and(|task| !task.is_deleted() && task.revision() == revision);
        Ok(current.then(|| state.replace_slot(entry)))
    }

    async fn find_matching(
        &self,
        scope: &RetireScope,
    ) -> NotificationLedgerResult<Vec<LedgerEntry>> {
        Ok(self
            .ledger_read()?
            .ledger
            .iter()
            .filter(|entry| scope.covers(entry))
            .cloned()
            .collect())
    }

    async fn find_by_task(&self, task_id: TaskId) -> NotificationLedgerResult<Vec<LedgerEntry>> {
        self.find_matching(&RetireScope::Task(task_id)).await
    }

    async fn find_by_recipients(
        &self,
        recipients: &[Recipient],
    ) -> NotificationLedgerResult<Vec<LedgerEntry>> {
        Ok(self
            .ledger_read()?
            .ledger
            .iter()
            .filter(|entry| recipients.contains(&entry.recipient))
            .cloned()
            .collect())
    }

    async fn remove_entries(&self, ids: &[LedgerEntryId]) -> NotificationLedgerResult<usize> {
        let mut state = self.ledger_write()?;
        let before = state.ledger.len();
        state.ledger.retain(|entry| !ids.contains(&entry.id));
        Ok(before - state.ledger.len())
    }
}
