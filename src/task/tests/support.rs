//! Shared wiring for service-level tests.

use std::sync::Arc;

use crate::config::{EngineConfig, RetryPolicy};
use crate::directory::{
    adapters::memory::InMemoryIdentityDirectory,
    domain::{ClientId, CompanyAccess, CompanyId, InternalUserId, WorkspaceId},
};
use crate::notification::{adapters::memory::InMemoryNotificationPlatform, domain::LedgerEntry};
use crate::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{Actor, AssigneeFields, Task, WorkflowState, WorkflowStateId, WorkflowStateType},
    services::{CreateTaskRequest, TaskService},
};
use mockable::DefaultClock;

pub(super) type TestService = TaskService<
    InMemoryTaskStore,
    InMemoryNotificationPlatform,
    InMemoryIdentityDirectory,
    DefaultClock,
>;

/// One workspace with an open and a done workflow state and an
/// unrestricted administrator.
pub(super) struct Harness {
    pub workspace: WorkspaceId,
    pub store: Arc<InMemoryTaskStore>,
    pub directory: Arc<InMemoryIdentityDirectory>,
    pub platform: Arc<InMemoryNotificationPlatform>,
    pub service: TestService,
    pub open: WorkflowStateId,
    pub done: WorkflowStateId,
    pub admin_id: InternalUserId,
    pub admin: Actor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let workspace = WorkspaceId::new();
        let store = Arc::new(InMemoryTaskStore::new());
        let directory = Arc::new(InMemoryIdentityDirectory::new());
        let platform = Arc::new(InMemoryNotificationPlatform::new());

        let open = WorkflowState::new(workspace, "Todo", WorkflowStateType::Unstarted);
        let done = WorkflowState::new(workspace, "Done", WorkflowStateType::Completed);
        let (open_id, done_id) = (open.id, done.id);
        store.insert_workflow_state(open).expect("seed open state");
        store.insert_workflow_state(done).expect("seed done state");

        let admin_id = directory
            .add_internal_user(workspace, CompanyAccess::Unrestricted)
            .expect("seed administrator");
        let service = TaskService::new(
            Arc::clone(&store),
            Arc::clone(&directory),
            Arc::clone(&platform),
            Arc::new(DefaultClock),
            config.with_directory_retry(RetryPolicy::immediate(3)),
        );

        Self {
            workspace,
            store,
            directory,
            platform,
            service,
            open: open_id,
            done: done_id,
            admin_id,
            admin: Actor::internal_user(workspace, admin_id),
        }
    }

    pub fn staff(&self) -> (InternalUserId, Actor) {
        let id = self
            .directory
            .add_internal_user(self.workspace, CompanyAccess::Unrestricted)
            .expect("seed internal user");
        (id, Actor::internal_user(self.workspace, id))
    }

    pub fn restricted_staff(&self, companies: &[CompanyId]) -> (InternalUserId, Actor) {
        let id = self
            .directory
            .add_internal_user(self.workspace, CompanyAccess::limited(companies.iter().copied()))
            .expect("seed restricted internal user");
        (
            id,
            Actor::restricted_internal_user(self.workspace, id, companies.iter().copied()),
        )
    }

    pub fn company(&self) -> CompanyId {
        self.directory
            .add_company(self.workspace)
            .expect("seed company")
    }

    pub fn client(&self, company_id: CompanyId) -> (ClientId, Actor) {
        let id = self
            .directory
            .add_client(self.workspace, [company_id])
            .expect("seed client");
        (id, Actor::client(self.workspace, id, company_id))
    }

    pub fn ledger(&self) -> Vec<LedgerEntry> {
        self.store.ledger_snapshot().expect("ledger snapshot")
    }

    pub async fn create(&self, title: &str, assignee: AssigneeFields) -> Task {
        self.service
            .create_task(
                &self.admin,
                CreateTaskRequest::new(title, self.open).with_assignee(assignee),
            )
            .await
            .expect("task creation should succeed")
            .task
    }
}
