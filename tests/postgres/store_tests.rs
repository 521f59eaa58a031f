//! Guarded commits and ledger bookkeeping against `PostgreSQL`.

use crate::postgres::helpers::{PgWorkspace, pg_workspace};
use diesel::prelude::*;
use mockable::DefaultClock;
use rstest::rstest;
use std::collections::BTreeSet;
use taskshare::directory::domain::{ClientId, CompanyId, InternalUserId};
use taskshare::notification::{
    domain::{
        ExternalNotificationId, LedgerEntry, LedgerEntryId, NotificationKind, Recipient,
        RetireScope,
    },
    ports::NotificationLedgerRepository,
};
use taskshare::task::{
    domain::{ActorId, NewTask, Task, TaskId, TaskPath, WorkflowState, WorkflowStateType},
    ports::{
        CommitGuard, TaskRepository, TaskRepositoryError, TaskWrite, TaskWriteBatch,
        WorkflowStateRepository,
    },
};

fn insert_task(workspace: &PgWorkspace, path: TaskPath) -> Task {
    let task = Task::create(
        NewTask {
            path,
            workspace_id: workspace.id,
            title: "Stored task".to_owned(),
            assignee: None,
            viewers: Vec::new(),
            workflow_state_id: workspace.open,
            created_by: ActorId::InternalUser(InternalUserId::new()),
        },
        &DefaultClock,
    )
    .expect("valid task");
    workspace
        .run(
            workspace
                .store
                .commit(TaskWriteBatch::new(TaskWrite::Insert(task.clone()))),
        )
        .expect("insert should succeed");
    task
}

fn stored(workspace: &PgWorkspace, id: TaskId) -> Task {
    workspace
        .run(workspace.store.find_by_id(id))
        .expect("lookup should succeed")
        .expect("task should exist")
}

fn entry(recipient: Recipient, task_id: TaskId, external: &str) -> LedgerEntry {
    LedgerEntry::issued(
        recipient,
        task_id,
        ExternalNotificationId::new(external),
        NotificationKind::Assigned,
        &DefaultClock,
    )
}

fn record(workspace: &PgWorkspace, row: &LedgerEntry) -> Vec<LedgerEntry> {
    workspace
        .run(workspace.store.replace_outstanding(row.clone()))
        .expect("ledger write")
}

fn entry_ids(entries: &[LedgerEntry]) -> BTreeSet<LedgerEntryId> {
    entries.iter().map(|row| row.id).collect()
}

#[rstest]
fn guarded_delete_lands_whole_or_not_at_all(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    let root = insert_task(&workspace, TaskPath::root(TaskId::new()));
    let child = insert_task(&workspace, root.path().child(TaskId::new()));
    let row = entry(Recipient::internal_user(InternalUserId::new()), child.id(), "ntf-1");
    record(&workspace, &row);
    let mut deleted = child.clone();
    deleted.mark_deleted(&DefaultClock);
    let delete = || {
        TaskWriteBatch::new(TaskWrite::Delete(deleted.clone()))
            .with_ledger_removals(vec![row.id])
    };

    let refused = workspace.run(
        workspace
            .store
            .commit(delete().with_guard(CommitGuard::new(child.revision(), []))),
    );

    assert!(matches!(refused, Err(TaskRepositoryError::Conflict(id)) if id == child.id()));
    assert!(!stored(&workspace, child.id()).is_deleted());
    assert_eq!(stored(&workspace, root.id()).subtask_count(), 1);
    assert_eq!(entry_ids(&workspace.ledger_for(child.id())), BTreeSet::from([row.id]));

    workspace
        .run(
            workspace
                .store
                .commit(delete().with_guard(CommitGuard::new(child.revision(), [row.id]))),
        )
        .expect("guarded delete should succeed");

    assert!(stored(&workspace, child.id()).is_deleted());
    assert_eq!(stored(&workspace, root.id()).subtask_count(), 0);
    assert!(workspace.ledger_for(child.id()).is_empty());
}

#[rstest]
fn stale_revision_guard_is_refused(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    let task = insert_task(&workspace, TaskPath::root(TaskId::new()));
    let guard = CommitGuard::new(task.revision(), []);
    let mut winner = task.clone();
    winner.rename("Winner", &DefaultClock).expect("rename");
    let mut loser = task.clone();
    loser.set_archived(true, &DefaultClock);

    workspace
        .run(
            workspace
                .store
                .commit(TaskWriteBatch::new(TaskWrite::Update(winner)).with_guard(guard.clone())),
        )
        .expect("first guarded update");
    let result = workspace.run(
        workspace
            .store
            .commit(TaskWriteBatch::new(TaskWrite::Update(loser)).with_guard(guard)),
    );

    assert!(matches!(result, Err(TaskRepositoryError::Conflict(id)) if id == task.id()));
    let reloaded = stored(&workspace, task.id());
    assert_eq!(reloaded.title(), "Winner");
    assert!(!reloaded.is_archived());
    assert_eq!(reloaded.revision(), 1);
}

#[rstest]
fn replacing_a_slot_displaces_only_that_slot(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    let task = insert_task(&workspace, TaskPath::root(TaskId::new()));
    let staff = Recipient::internal_user(InternalUserId::new());
    let client = Recipient::client(ClientId::new(), CompanyId::new());
    let first = entry(staff, task.id(), "ntf-1");
    let second = entry(staff, task.id(), "ntf-2");
    let other = entry(client, task.id(), "ntf-3");

    assert!(record(&workspace, &first).is_empty());
    assert!(record(&workspace, &other).is_empty());
    let displaced = record(&workspace, &second);

    assert_eq!(entry_ids(&displaced), BTreeSet::from([first.id]));
    assert_eq!(
        entry_ids(&workspace.ledger_for(task.id())),
        BTreeSet::from([second.id, other.id])
    );
}

#[rstest]
fn the_recipient_task_constraint_rejects_raw_duplicates(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    let task = insert_task(&workspace, TaskPath::root(TaskId::new()));
    let recipient = Recipient::internal_user(InternalUserId::new());
    record(&workspace, &entry(recipient, task.id(), "ntf-1"));
    let mut connection = PgConnection::establish(&workspace.database_url()).expect("connect");

    let duplicate = diesel::sql_query(concat!(
        "INSERT INTO notification_ledger ",
        "(id, recipient_kind, recipient_id, company_id, task_id, external_id, kind, created_at) ",
        "VALUES ($1, 'internal_user', $2, NULL, $3, 'ntf-raw', 'assigned', NOW())",
    ))
    .bind::<diesel::sql_types::Uuid, _>(uuid::Uuid::new_v4())
    .bind::<diesel::sql_types::Uuid, _>(recipient.recipient_id())
    .bind::<diesel::sql_types::Uuid, _>(task.id().into_inner())
    .execute(&mut connection);

    assert!(matches!(
        duplicate,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _
        ))
    ));
}

#[rstest]
fn concurrent_replacements_of_one_slot_keep_a_single_row(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    let task = insert_task(&workspace, TaskPath::root(TaskId::new()));
    let recipient = Recipient::client(ClientId::new(), CompanyId::new());
    let rows: Vec<_> = ["ntf-a", "ntf-b", "ntf-c", "ntf-d"]
        .into_iter()
        .map(|external| entry(recipient, task.id(), external))
        .collect();

    let results = workspace.run(futures::future::join_all(
        rows.iter()
            .map(|row| workspace.store.replace_outstanding(row.clone())),
    ));

    let mut displaced = Vec::new();
    for result in results {
        displaced.extend(result.expect("concurrent replacement should succeed"));
    }
    let remaining = workspace.ledger_for(task.id());
    assert_eq!(remaining.len(), 1);
    assert_eq!(displaced.len(), rows.len() - 1);
    let mut accounted = entry_ids(&displaced);
    accounted.extend(remaining.iter().map(|row| row.id));
    assert_eq!(accounted, entry_ids(&rows));
}

#[rstest]
fn ledger_rows_only_land_for_the_live_current_revision(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    let task = insert_task(&workspace, TaskPath::root(TaskId::new()));
    let gone = insert_task(&workspace, TaskPath::root(TaskId::new()));
    let mut renamed = task.clone();
    renamed.rename("Renamed", &DefaultClock).expect("rename");
    let mut deleted = gone.clone();
    deleted.mark_deleted(&DefaultClock);
    for write in [TaskWrite::Update(renamed.clone()), TaskWrite::Delete(deleted.clone())] {
        workspace
            .run(workspace.store.commit(TaskWriteBatch::new(write)))
            .expect("write");
    }
    let recipient = Recipient::internal_user(InternalUserId::new());
    let attempt = |task_id, external, revision| {
        workspace
            .run(
                workspace
                    .store
                    .replace_outstanding_if_current(entry(recipient, task_id, external), revision),
            )
            .expect("guarded ledger write")
    };

    assert_eq!(attempt(task.id(), "ntf-stale", task.revision()), None);
    assert_eq!(attempt(gone.id(), "ntf-deleted", deleted.revision()), None);
    assert_eq!(attempt(TaskId::new(), "ntf-orphan", 0), None);
    assert_eq!(attempt(task.id(), "ntf-current", renamed.revision()), Some(Vec::new()));
    let ledger = workspace.ledger_for(task.id());
    assert_eq!(ledger.len(), 1);
    assert!(
        ledger
            .iter()
            .all(|row| row.external_id == ExternalNotificationId::new("ntf-current"))
    );
    assert!(workspace.ledger_for(gone.id()).is_empty());
}

#[rstest]
fn retire_scopes_and_recipient_lookups_filter_in_sql(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    let first = insert_task(&workspace, TaskPath::root(TaskId::new()));
    let second = insert_task(&workspace, TaskPath::root(TaskId::new()));
    let company = CompanyId::new();
    let alice_id = ClientId::new();
    let alice = Recipient::client(alice_id, company);
    let bob = Recipient::client(ClientId::new(), company);
    let alice_elsewhere = Recipient::client(alice_id, CompanyId::new());
    let staff = Recipient::internal_user(InternalUserId::new());
    let alice_first = entry(alice, first.id(), "a1");
    let bob_first = entry(bob, first.id(), "b1");
    let staff_first = entry(staff, first.id(), "s1");
    let elsewhere_second = entry(alice_elsewhere, second.id(), "a2");
    for row in [&alice_first, &bob_first, &staff_first, &elsewhere_second] {
        record(&workspace, row);
    }
    let matching = |scope: RetireScope| {
        entry_ids(
            &workspace
                .run(workspace.store.find_matching(&scope))
                .expect("scope lookup"),
        )
    };

    assert_eq!(
        matching(RetireScope::Task(first.id())),
        BTreeSet::from([alice_first.id, bob_first.id, staff_first.id])
    );
    assert_eq!(
        matching(RetireScope::CompanyRecipients {
            company_id: company,
            recipients: BTreeSet::from([alice, bob]),
        }),
        BTreeSet::from([alice_first.id, bob_first.id])
    );
    assert_eq!(
        matching(RetireScope::Entry(staff_first.id)),
        BTreeSet::from([staff_first.id])
    );
    let by_recipient = workspace
        .run(workspace.store.find_by_recipients(&[alice_elsewhere]))
        .expect("recipient lookup");
    assert_eq!(entry_ids(&by_recipient), BTreeSet::from([elsewhere_second.id]));
}

#[rstest]
fn workflow_states_are_listed_per_workspace_by_name(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    workspace
        .run(workspace.store.insert_workflow_state(WorkflowState::new(
            workspace.id,
            "Backlog",
            WorkflowStateType::Backlog,
        )))
        .expect("seed state");

    let listed = workspace
        .run(workspace.store.list_workflow_states(workspace.id))
        .expect("listing");
    let names: Vec<_> = listed.iter().map(|state| state.name.as_str()).collect();
    let found = workspace
        .run(workspace.store.find_workflow_state(workspace.done))
        .expect("lookup")
        .map(|state| state.state_type);

    assert_eq!(names, vec!["Backlog", "Done", "In progress"]);
    assert_eq!(found, Some(WorkflowStateType::Completed));
}
