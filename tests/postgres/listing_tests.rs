//! Visibility listings and ledger upkeep with predicates compiled to SQL.

use crate::postgres::helpers::{PgWorkspace, pg_workspace};
use rstest::rstest;
use taskshare::directory::domain::InternalUserId;
use taskshare::notification::domain::Recipient;
use taskshare::task::{
    domain::{Actor, AssigneeFields, Task, TaskId, ViewerGrant},
    services::UpdateTaskRequest,
};
use taskshare::visibility::VisibilityOptions;

fn ids(tasks: &[Task]) -> Vec<TaskId> {
    tasks.iter().map(Task::id).collect()
}

fn listed(workspace: &PgWorkspace, actor: &Actor, options: &VisibilityOptions) -> Vec<TaskId> {
    ids(&workspace
        .run(workspace.service.list_tasks(actor, options))
        .expect("listing"))
}

fn share(workspace: &PgWorkspace, task_id: TaskId, grants: impl IntoIterator<Item = ViewerGrant>) {
    workspace
        .run(workspace.service.update_task(
            &workspace.admin,
            task_id,
            UpdateTaskRequest::new().with_viewers(grants),
        ))
        .expect("share task");
}

#[rstest]
fn hidden_ancestors_promote_the_first_visible_subtask(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    let first_company = workspace.company();
    let second_company = workspace.company();
    let (u1, _) = workspace.client(first_company);
    let (u2, u2_actor) = workspace.client(second_company);
    let a = workspace.create("A", None, AssigneeFields::client(u1, first_company));
    let b = workspace.create("B", Some(a.id()), AssigneeFields::client(u2, second_company));
    let c = workspace.create("C", Some(b.id()), AssigneeFields::client(u2, second_company));

    assert_eq!(
        listed(&workspace, &u2_actor, &VisibilityOptions::top_level()),
        vec![b.id()]
    );
    assert_eq!(
        listed(&workspace, &u2_actor, &VisibilityOptions::children_of(a.id())),
        vec![b.id()]
    );
    assert_eq!(
        listed(&workspace, &u2_actor, &VisibilityOptions::children_of(b.id())),
        vec![c.id()]
    );
    assert_eq!(
        listed(&workspace, &workspace.admin, &VisibilityOptions::top_level()),
        vec![a.id()]
    );
}

#[rstest]
fn company_grants_cover_every_member_and_client_grants_one(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    let owner = workspace.company();
    let partner = workspace.company();
    let (alice, alice_actor) = workspace.client(partner);
    let (_, bob_actor) = workspace.client(partner);
    let board = workspace.create("Board pack", None, AssigneeFields::company(owner));
    let memo = workspace.create("Memo", None, AssigneeFields::company(owner));
    share(&workspace, board.id(), [ViewerGrant::company(partner)]);
    share(&workspace, memo.id(), [ViewerGrant::client(alice, partner)]);
    let options = VisibilityOptions::default();

    let mut for_alice = listed(&workspace, &alice_actor, &options);
    for_alice.sort();
    let mut expected = vec![board.id(), memo.id()];
    expected.sort();

    assert_eq!(for_alice, expected);
    assert_eq!(listed(&workspace, &bob_actor, &options), vec![board.id()]);
    assert!(listed(&workspace, &bob_actor, &options.with_viewer_grants(false)).is_empty());
}

#[rstest]
fn restricted_staff_reach_grants_for_their_companies(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    let allowed = workspace.company();
    let other = workspace.company();
    let restricted =
        Actor::restricted_internal_user(workspace.id, InternalUserId::new(), [allowed]);
    let shared = workspace.create("Shared", None, AssigneeFields::company(other));
    let hidden = workspace.create("Hidden", None, AssigneeFields::company(other));
    share(&workspace, shared.id(), [ViewerGrant::company(allowed)]);

    let board = listed(&workspace, &restricted, &VisibilityOptions::top_level());

    assert_eq!(board, vec![shared.id()]);
    assert!(!board.contains(&hidden.id()));
}

#[rstest]
fn reassignment_and_deletion_keep_the_ledger_in_step(pg_workspace: Option<PgWorkspace>) {
    let Some(workspace) = pg_workspace else {
        return;
    };
    let company = workspace.company();
    let (first, _) = workspace.client(company);
    let (second, _) = workspace.client(company);
    let task = workspace.create("Countersign", None, AssigneeFields::client(first, company));
    let holders = |workspace: &PgWorkspace| -> Vec<Recipient> {
        workspace
            .ledger_for(task.id())
            .into_iter()
            .map(|entry| entry.recipient)
            .collect()
    };
    assert_eq!(holders(&workspace), vec![Recipient::client(first, company)]);

    workspace
        .run(workspace.service.update_task(
            &workspace.admin,
            task.id(),
            UpdateTaskRequest::new().with_assignee(AssigneeFields::client(second, company)),
        ))
        .expect("reassign");
    assert_eq!(holders(&workspace), vec![Recipient::client(second, company)]);

    workspace
        .run(workspace.service.delete_task(&workspace.admin, task.id()))
        .expect("delete");
    assert!(holders(&workspace).is_empty());
}
