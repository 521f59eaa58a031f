//! `PostgreSQL` store for tasks, workflow states, and the ledger.

use super::{
    models::{LedgerRow, TaskChangeset, TaskRow, WorkflowStateRow},
    predicate_sql::SqlFilter,
    schema::{notification_ledger, tasks, workflow_states},
};
use crate::directory::domain::{ClientId, CompanyId, InternalUserId, WorkspaceId};
use crate::notification::{
    domain::{
        ExternalNotificationId, LedgerEntry, LedgerEntryId, NotificationKind, Recipient,
        RetireScope,
    },
    ports::{NotificationLedgerError, NotificationLedgerRepository, NotificationLedgerResult},
};
use crate::task::{
    domain::{
        ActorId, AssigneeFields, PersistedTaskData, Task, TaskId, TaskPath, ViewerGrant,
        WorkflowState, WorkflowStateId, WorkflowStateType,
    },
    ports::{
        CommitGuard, TaskRepository, TaskRepositoryError, TaskRepositoryResult, TaskWrite,
        TaskWriteBatch, WorkflowStateRepository,
    },
};
use crate::visibility::TaskPredicate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::HashMap;

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed implementation of every task storage port.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: TaskPgPool,
}

/// Errors that can report a pool or join failure.
trait StorageFailure: Send + 'static {
    fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self;
}

impl StorageFailure for TaskRepositoryError {
    fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::persistence(err)
    }
}

impl StorageFailure for NotificationLedgerError {
    fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::persistence(err)
    }
}

impl From<DieselError> for TaskRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

impl From<DieselError> for NotificationLedgerError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

impl PostgresTaskStore {
    /// Creates a store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    /// Registers a workflow state.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::Persistence`] when the insert fails.
    pub async fn insert_workflow_state(&self, state: WorkflowState) -> TaskRepositoryResult<()> {
        let row = WorkflowStateRow {
            id: state.id.into_inner(),
            workspace_id: state.workspace_id.into_inner(),
            name: state.name,
            state_type: state.state_type.as_str().to_owned(),
        };
        self.run_blocking(move |connection| {
            diesel::insert_into(workflow_states::table)
                .values(&row)
                .execute(connection)?;
            Ok(())
        })
        .await
    }

    async fn run_blocking<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: StorageFailure,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(E::storage)?;
            f(&mut connection)
        })
        .await
        .map_err(E::storage)?
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskStore {
    async fn commit(&self, batch: TaskWriteBatch) -> TaskRepositoryResult<()> {
        let guarded_tasks: Vec<uuid::Uuid> = batch
            .guarded_tasks()
            .into_iter()
            .map(TaskId::into_inner)
            .collect();
        let TaskWriteBatch {
            write,
            deleted_descendants,
            ledger_removals,
            guard,
        } = batch;
        let task_id = write.task().id();
        let rows = WriteRows::try_from(write)?;
        let descendants = deleted_descendants
            .iter()
            .map(|task| Ok((task.id(), to_changeset(task)?)))
            .collect::<TaskRepositoryResult<Vec<_>>>()?;
        let removals: Vec<uuid::Uuid> = ledger_removals
            .into_iter()
            .map(LedgerEntryId::into_inner)
            .collect();

        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|connection| {
                if let Some(expected) = &guard {
                    check_guard(connection, task_id, &guarded_tasks, expected)?;
                }
                rows.apply(connection)?;
                for (task_id, changeset) in &descendants {
                    update_task(connection, *task_id, changeset)?;
                }
                if !removals.is_empty() {
                    diesel::delete(
                        notification_ledger::table
                            .filter(notification_ledger::id.eq_any(&removals)),
                    )
                    .execute(connection)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .find(id.into_inner())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn find_many(&self, ids: &[TaskId]) -> TaskRepositoryResult<Vec<Task>> {
        let order: Vec<TaskId> = ids.to_vec();
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        let mut found: HashMap<TaskId, Task> = self
            .run_blocking(move |connection| {
                let rows = tasks::table
                    .filter(tasks::id.eq_any(&uuids))
                    .select(TaskRow::as_select())
                    .load::<TaskRow>(connection)?;
                rows.into_iter()
                    .map(|row| row_to_task(row).map(|task| (task.id(), task)))
                    .collect::<TaskRepositoryResult<HashMap<_, _>>>()
            })
            .await?;
        Ok(order.iter().filter_map(|id| found.remove(id)).collect())
    }

    async fn query(&self, predicate: &TaskPredicate) -> TaskRepositoryResult<Vec<Task>> {
        if predicate.is_nothing() {
            return Ok(Vec::new());
        }
        let filter = SqlFilter::compile(predicate);
        self.run_blocking(move |connection| {
            let sql = filter.listing_sql();
            let rows = filter
                .bind_all(diesel::sql_query(sql).into_boxed::<Pg>())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn find_descendants(&self, path: &TaskPath) -> TaskRepositoryResult<Vec<Task>> {
        let prefix = format!("{}%", path.descendant_prefix());
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::path.like(prefix))
                .filter(tasks::deleted_at.is_null())
                .order((tasks::created_at.asc(), tasks::id.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }
}

#[async_trait]
impl WorkflowStateRepository for PostgresTaskStore {
    async fn find_workflow_state(
        &self,
        id: WorkflowStateId,
    ) -> TaskRepositoryResult<Option<WorkflowState>> {
        self.run_blocking(move |connection| {
            let row = workflow_states::table
                .find(id.into_inner())
                .select(WorkflowStateRow::as_select())
                .first::<WorkflowStateRow>(connection)
                .optional()?;
            row.map(row_to_workflow_state).transpose()
        })
        .await
    }

    async fn list_workflow_states(
        &self,
        workspace_id: WorkspaceId,
    ) -> TaskRepositoryResult<Vec<WorkflowState>> {
        self.run_blocking(move |connection| {
            let rows = workflow_states::table
                .filter(workflow_states::workspace_id.eq(workspace_id.into_inner()))
                .order(workflow_states::name.asc())
                .select(WorkflowStateRow::as_select())
                .load::<WorkflowStateRow>(connection)?;
            rows.into_iter().map(row_to_workflow_state).collect()
        })
        .await
    }
}

#[async_trait]
impl NotificationLedgerRepository for PostgresTaskStore {
    async fn replace_outstanding(
        &self,
        entry: LedgerEntry,
    ) -> NotificationLedgerResult<Vec<LedgerEntry>> {
        let row = to_ledger_row(&entry);
        self.run_blocking(move |connection| {
            connection.transaction::<_, NotificationLedgerError, _>(|connection| {
                replace_slot(connection, &row)
            })
        })
        .await
    }

    async fn replace_outstanding_if_current(
        &self,
        entry: LedgerEntry,
        revision: u64,
    ) -> NotificationLedgerResult<Option<Vec<LedgerEntry>>> {
        let row = to_ledger_row(&entry);
        let expected = i64::try_from(revision).map_err(NotificationLedgerError::persistence)?;
        self.run_blocking(move |connection| {
            connection.transaction::<_, NotificationLedgerError, _>(|connection| {
                let stored = tasks::table
                    .find(row.task_id)
                    .select((tasks::revision, tasks::deleted_at))
                    .for_share()
                    .first::<(i64, Option<DateTime<Utc>>)>(connection)
                    .optional()?;
                if !matches!(stored, Some((current, None)) if current == expected) {
                    return Ok(None);
                }
                replace_slot(connection, &row).map(Some)
            })
        })
        .await
    }

    async fn find_matching(
        &self,
        scope: &RetireScope,
    ) -> NotificationLedgerResult<Vec<LedgerEntry>> {
        let owned_scope = scope.clone();
        self.run_blocking(move |connection| {
            let mut query = notification_ledger::table
                .select(LedgerRow::as_select())
                .into_boxed();
            query = match &owned_scope {
                RetireScope::Entry(id) => query.filter(notification_ledger::id.eq(id.into_inner())),
                RetireScope::Task(task_id) => {
                    query.filter(notification_ledger::task_id.eq(task_id.into_inner()))
                }
                RetireScope::CompanyRecipients {
                    company_id,
                    recipients,
                } => query
                    .filter(notification_ledger::company_id.eq(company_id.into_inner()))
                    .filter(notification_ledger::recipient_id.eq_any(recipient_ids(recipients))),
            };
            let rows = query
                .order(notification_ledger::created_at.asc())
                .load::<LedgerRow>(connection)?;
            let entries = rows
                .into_iter()
                .map(row_to_ledger_entry)
                .collect::<NotificationLedgerResult<Vec<_>>>()?;
            Ok(entries
                .into_iter()
                .filter(|entry| owned_scope.covers(entry))
                .collect())
        })
        .await
    }

    async fn find_by_task(&self, task_id: TaskId) -> NotificationLedgerResult<Vec<LedgerEntry>> {
        self.find_matching(&RetireScope::Task(task_id)).await
    }

    async fn find_by_recipients(
        &self,
        recipients: &[Recipient],
    ) -> NotificationLedgerResult<Vec<LedgerEntry>> {
        let wanted: Vec<Recipient> = recipients.to_vec();
        self.run_blocking(move |connection| {
            let rows = notification_ledger::table
                .filter(notification_ledger::recipient_id.eq_any(recipient_ids(&wanted)))
                .order(notification_ledger::created_at.asc())
                .select(LedgerRow::as_select())
                .load::<LedgerRow>(connection)?;
            let entries = rows
                .into_iter()
                .map(row_to_ledger_entry)
                .collect::<NotificationLedgerResult<Vec<_>>>()?;
            Ok(entries
                .into_iter()
                .filter(|entry| wanted.contains(&entry.recipient))
                .collect())
        })
        .await
    }

    async fn remove_entries(&self, ids: &[LedgerEntryId]) -> NotificationLedgerResult<usize> {
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        self.run_blocking(move |connection| {
            let removed = diesel::delete(
                notification_ledger::table.filter(notification_ledger::id.eq_any(&uuids)),
            )
            .execute(connection)?;
            Ok(removed)
        })
        .await
    }
}

/// Row-level form of a [`TaskWrite`].
enum WriteRows {
    Insert(Box<TaskRow>),
    Update(TaskId, TaskChangeset),
    Delete {
        task_id: TaskId,
        parent_id: Option<TaskId>,
        changeset: TaskChangeset,
    },
}

impl TryFrom<TaskWrite> for WriteRows {
    type Error = TaskRepositoryError;

    fn try_from(write: TaskWrite) -> Result<Self, Self::Error> {
        Ok(match write {
            TaskWrite::Insert(task) => Self::Insert(Box::new(to_row(&task)?)),
            TaskWrite::Update(task) => Self::Update(task.id(), to_changeset(&task)?),
            TaskWrite::Delete(task) => Self::Delete {
                task_id: task.id(),
                parent_id: task.parent_id(),
                changeset: to_changeset(&task)?,
            },
        })
    }
}

impl WriteRows {
    fn apply(&self, connection: &mut PgConnection) -> TaskRepositoryResult<()> {
        match self {
            Self::Insert(row) => {
                let task_id = TaskId::from_uuid(row.id);
                diesel::insert_into(tasks::table)
                    .values(row.as_ref())
                    .execute(connection)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            TaskRepositoryError::DuplicateTask(task_id)
                        }
                        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                            row.parent_id.map_or_else(
                                || TaskRepositoryError::persistence(err),
                                |parent| TaskRepositoryError::NotFound(TaskId::from_uuid(parent)),
                            )
                        }
                        _ => TaskRepositoryError::persistence(err),
                    })?;
                if let Some(parent_id) = row.parent_id {
                    diesel::update(tasks::table.find(parent_id))
                        .set(tasks::subtask_count.eq(tasks::subtask_count + 1))
                        .execute(connection)?;
                }
                Ok(())
            }
            Self::Update(task_id, changeset) => update_task(connection, *task_id, changeset),
            Self::Delete {
                task_id,
                parent_id,
                changeset,
            } => {
                let stored_deleted_at = tasks::table
                    .find(task_id.into_inner())
                    .select(tasks::deleted_at)
                    .for_update()
                    .first::<Option<DateTime<Utc>>>(connection)
                    .optional()?
                    .ok_or(TaskRepositoryError::NotFound(*task_id))?;
                update_task(connection, *task_id, changeset)?;
                if let (None, Some(parent_id)) = (stored_deleted_at, parent_id) {
                    diesel::update(
                        tasks::table
                            .find(parent_id.into_inner())
                            .filter(tasks::subtask_count.gt(0)),
                    )
                    .set(tasks::subtask_count.eq(tasks::subtask_count - 1))
                    .execute(connection)?;
                }
                Ok(())
            }
        }
    }
}

/// Locks the guarded task rows, then compares the primary task's revision
/// and the ledger rows held for every guarded task.
fn check_guard(
    connection: &mut PgConnection,
    task_id: TaskId,
    guarded_tasks: &[uuid::Uuid],
    guard: &CommitGuard,
) -> TaskRepositoryResult<()> {
    let revisions = tasks::table
        .filter(tasks::id.eq_any(guarded_tasks))
        .select((tasks::id, tasks::revision))
        .for_update()
        .load::<(uuid::Uuid, i64)>(connection)?;
    let stored_revision = revisions
        .iter()
        .find(|(id, _)| *id == task_id.into_inner())
        .ok_or(TaskRepositoryError::NotFound(task_id))
        .and_then(|(_, revision)| {
            u64::try_from(*revision).map_err(|err| corrupt(task_id.into_inner(), err))
        })?;
    let outstanding = notification_ledger::table
        .filter(notification_ledger::task_id.eq_any(guarded_tasks))
        .select(notification_ledger::id)
        .load::<uuid::Uuid>(connection)?
        .into_iter()
        .map(LedgerEntryId::from_uuid)
        .collect::<Vec<_>>();
    if guard.holds(stored_revision, &outstanding) {
        Ok(())
    } else {
        Err(TaskRepositoryError::Conflict(task_id))
    }
}

/// Insert attempts that tolerate a concurrent writer filling the slot.
const SLOT_CLAIM_ATTEMPTS: usize = 3;

/// Frees the entry's (recipient, task) slot and inserts it, returning the
/// displaced rows.
///
/// A row committed into the slot by a concurrent writer between the delete
/// and the insert is displaced on the next pass.
fn replace_slot(
    connection: &mut PgConnection,
    row: &LedgerRow,
) -> NotificationLedgerResult<Vec<LedgerEntry>> {
    let mut displaced = Vec::new();
    for _ in 0..SLOT_CLAIM_ATTEMPTS {
        displaced.extend(free_slot(connection, row)?);
        let inserted = diesel::insert_into(notification_ledger::table)
            .values(row)
            .on_conflict((notification_ledger::recipient_id, notification_ledger::task_id))
            .do_nothing()
            .execute(connection)?;
        if inserted > 0 {
            return displaced.into_iter().map(row_to_ledger_entry).collect();
        }
    }
    displaced.extend(free_slot(connection, row)?);
    diesel::insert_into(notification_ledger::table)
        .values(row)
        .execute(connection)?;
    displaced.into_iter().map(row_to_ledger_entry).collect()
}

fn free_slot(connection: &mut PgConnection, row: &LedgerRow) -> QueryResult<Vec<LedgerRow>> {
    diesel::delete(
        notification_ledger::table
            .filter(notification_ledger::recipient_id.eq(row.recipient_id))
            .filter(notification_ledger::task_id.eq(row.task_id)),
    )
    .returning(LedgerRow::as_returning())
    .get_results::<LedgerRow>(connection)
}

fn update_task(
    connection: &mut PgConnection,
    task_id: TaskId,
    changeset: &TaskChangeset,
) -> TaskRepositoryResult<()> {
    let updated = diesel::update(tasks::table.find(task_id.into_inner()))
        .set(changeset)
        .execute(connection)?;
    if updated == 0 {
        return Err(TaskRepositoryError::NotFound(task_id));
    }
    Ok(())
}

fn recipient_ids<'a>(recipients: impl IntoIterator<Item = &'a Recipient>) -> Vec<uuid::Uuid> {
    recipients
        .into_iter()
        .map(Recipient::recipient_id)
        .collect()
}

fn corrupt(task_id: uuid::Uuid, err: impl std::fmt::Display) -> TaskRepositoryError {
    TaskRepositoryError::CorruptRow {
        task_id,
        reason: err.to_string(),
    }
}

fn to_row(task: &Task) -> TaskRepositoryResult<TaskRow> {
    let fields = AssigneeFields::from_assignee(task.assignee());
    let viewers =
        serde_json::to_value(task.viewers()).map_err(TaskRepositoryError::persistence)?;
    let subtask_count =
        i32::try_from(task.subtask_count()).map_err(TaskRepositoryError::persistence)?;
    let created_by = task.created_by();
    let revision = i64::try_from(task.revision()).map_err(TaskRepositoryError::persistence)?;
    Ok(TaskRow {
        id: task.id().into_inner(),
        workspace_id: task.workspace_id().into_inner(),
        parent_id: task.parent_id().map(TaskId::into_inner),
        title: task.title().to_owned(),
        assignee_internal_user_id: fields.internal_user_id.map(InternalUserId::into_inner),
        assignee_client_id: fields.client_id.map(ClientId::into_inner),
        assignee_company_id: fields.company_id.map(CompanyId::into_inner),
        viewers,
        path: task.path().encode(),
        workflow_state_id: task.workflow_state_id().into_inner(),
        is_archived: task.is_archived(),
        subtask_count,
        created_by_kind: created_by.kind_str().to_owned(),
        created_by_id: created_by.into_uuid(),
        deleted_at: task.deleted_at(),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
        revision,
    })
}

fn to_changeset(task: &Task) -> TaskRepositoryResult<TaskChangeset> {
    let fields = AssigneeFields::from_assignee(task.assignee());
    let viewers =
        serde_json::to_value(task.viewers()).map_err(TaskRepositoryError::persistence)?;
    let revision = i64::try_from(task.revision()).map_err(TaskRepositoryError::persistence)?;
    Ok(TaskChangeset {
        title: task.title().to_owned(),
        assignee_internal_user_id: fields.internal_user_id.map(InternalUserId::into_inner),
        assignee_client_id: fields.client_id.map(ClientId::into_inner),
        assignee_company_id: fields.company_id.map(CompanyId::into_inner),
        viewers,
        workflow_state_id: task.workflow_state_id().into_inner(),
        is_archived: task.is_archived(),
        deleted_at: task.deleted_at(),
        updated_at: task.updated_at(),
        revision,
    })
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let id = row.id;
    let assignee = AssigneeFields {
        internal_user_id: row.assignee_internal_user_id.map(InternalUserId::from_uuid),
        client_id: row.assignee_client_id.map(ClientId::from_uuid),
        company_id: row.assignee_company_id.map(CompanyId::from_uuid),
    }
    .into_assignee()
    .map_err(|err| corrupt(id, err))?;
    let viewers =
        serde_json::from_value::<Vec<ViewerGrant>>(row.viewers).map_err(|err| corrupt(id, err))?;
    let path = row.path.parse::<TaskPath>().map_err(|err| corrupt(id, err))?;
    let created_by = ActorId::from_parts(&row.created_by_kind, row.created_by_id)
        .map_err(|err| corrupt(id, err))?;
    let subtask_count = u32::try_from(row.subtask_count).map_err(|err| corrupt(id, err))?;
    let revision = u64::try_from(row.revision).map_err(|err| corrupt(id, err))?;

    Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(id),
        workspace_id: WorkspaceId::from_uuid(row.workspace_id),
        title: row.title,
        assignee,
        viewers,
        path,
        workflow_state_id: WorkflowStateId::from_uuid(row.workflow_state_id),
        archived: row.is_archived,
        subtask_count,
        created_by,
        deleted_at: row.deleted_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
        revision,
    })
    .map_err(|err| corrupt(id, err))
}

fn row_to_workflow_state(row: WorkflowStateRow) -> TaskRepositoryResult<WorkflowState> {
    let state_type =
        WorkflowStateType::try_from(row.state_type.as_str()).map_err(|err| corrupt(row.id, err))?;
    Ok(WorkflowState {
        id: WorkflowStateId::from_uuid(row.id),
        workspace_id: WorkspaceId::from_uuid(row.workspace_id),
        name: row.name,
        state_type,
    })
}

fn to_ledger_row(entry: &LedgerEntry) -> LedgerRow {
    LedgerRow {
        id: entry.id.into_inner(),
        recipient_kind: entry.recipient.kind().as_str().to_owned(),
        recipient_id: entry.recipient.recipient_id(),
        company_id: entry.recipient.company_id().map(CompanyId::into_inner),
        task_id: entry.task_id.into_inner(),
        external_id: entry.external_id.as_str().to_owned(),
        kind: entry.kind.as_str().to_owned(),
        created_at: entry.created_at,
    }
}

fn row_to_ledger_entry(row: LedgerRow) -> NotificationLedgerResult<LedgerEntry> {
    let entry_id = LedgerEntryId::from_uuid(row.id);
    let corrupt_entry = |err: &dyn std::fmt::Display| NotificationLedgerError::CorruptRow {
        entry_id,
        reason: err.to_string(),
    };
    let recipient = Recipient::from_parts(&row.recipient_kind, row.recipient_id, row.company_id)
        .map_err(|err| corrupt_entry(&err))?;
    let kind = NotificationKind::try_from(row.kind.as_str()).map_err(|err| corrupt_entry(&err))?;
    Ok(LedgerEntry {
        id: entry_id,
        recipient,
        task_id: TaskId::from_uuid(row.task_id),
        external_id: ExternalNotificationId::new(row.external_id),
        kind,
        created_at: row.created_at,
    })
}
