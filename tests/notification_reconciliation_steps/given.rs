//! Given steps for notification reconciliation BDD scenarios.

use super::world::{ReconciliationWorld, SeededWorkspace, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use taskshare::directory::domain::{CompanyAccess, WorkspaceId};
use taskshare::task::{
    domain::{Actor, AssigneeFields, WorkflowState, WorkflowStateType},
    services::CreateTaskRequest,
};

#[given("a workspace with an open and a done workflow state")]
fn workspace_with_states(world: &mut ReconciliationWorld) -> Result<(), eyre::Report> {
    let id = WorkspaceId::new();
    let open = WorkflowState::new(id, "In progress", WorkflowStateType::Started);
    let done = WorkflowState::new(id, "Done", WorkflowStateType::Completed);
    let (open_id, done_id) = (open.id, done.id);
    world
        .store
        .insert_workflow_state(open)
        .wrap_err("seed open workflow state")?;
    world
        .store
        .insert_workflow_state(done)
        .wrap_err("seed done workflow state")?;
    let admin_id = world
        .directory
        .add_internal_user(id, CompanyAccess::Unrestricted)
        .wrap_err("seed administrator")?;
    world.workspace = Some(SeededWorkspace {
        id,
        open: open_id,
        done: done_id,
        admin_id,
        admin: Actor::internal_user(id, admin_id),
    });
    Ok(())
}

#[given("a company with {count:usize} clients")]
fn company_with_clients(world: &mut ReconciliationWorld, count: usize) -> Result<(), eyre::Report> {
    let workspace_id = world.seeded()?.id;
    let company = world
        .directory
        .add_company(workspace_id)
        .wrap_err("seed company")?;
    for _ in 0..count {
        let client = world
            .directory
            .add_client(workspace_id, [company])
            .wrap_err("seed client")?;
        world.clients.push(client);
    }
    world.company = Some(company);
    Ok(())
}

#[given("a staff member")]
fn staff_member(world: &mut ReconciliationWorld) -> Result<(), eyre::Report> {
    let workspace_id = world.seeded()?.id;
    let staff = world
        .directory
        .add_internal_user(workspace_id, CompanyAccess::Unrestricted)
        .wrap_err("seed staff member")?;
    world.staff = Some(staff);
    Ok(())
}

#[given("a task assigned to client {position:usize}")]
fn task_assigned_to_client(
    world: &mut ReconciliationWorld,
    position: usize,
) -> Result<(), eyre::Report> {
    let assignee = AssigneeFields::client(world.client(position)?, world.company()?);
    create_task(world, assignee)
}

#[given("a task assigned to the company")]
fn task_assigned_to_company(world: &mut ReconciliationWorld) -> Result<(), eyre::Report> {
    let assignee = AssigneeFields::company(world.company()?);
    create_task(world, assignee)
}

fn create_task(
    world: &mut ReconciliationWorld,
    assignee: AssigneeFields,
) -> Result<(), eyre::Report> {
    let seeded = world.seeded()?.clone();
    let mutation = run_async(world.service.create_task(
        &seeded.admin,
        CreateTaskRequest::new("Quarterly review", seeded.open).with_assignee(assignee),
    ))
    .wrap_err("create task for scenario setup")?;
    world.task = Some(mutation.task);
    world
        .platform
        .clear_calls()
        .wrap_err("reset platform calls after setup")?;
    Ok(())
}
