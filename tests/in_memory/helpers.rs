//! Shared wiring for in-memory integration tests.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use taskshare::config::{EngineConfig, RetryPolicy};
use taskshare::directory::{
    adapters::memory::InMemoryIdentityDirectory,
    domain::{ClientId, CompanyAccess, CompanyId, InternalUserId, WorkspaceId},
};
use taskshare::notification::{
    adapters::memory::InMemoryNotificationPlatform, domain::LedgerEntry,
};
use taskshare::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{
        Actor, AssigneeFields, Task, TaskId, WorkflowState, WorkflowStateId, WorkflowStateType,
    },
    services::{CreateTaskRequest, TaskService},
};

/// Service type wired over the in-memory adapters.
pub type TestService = TaskService<
    InMemoryTaskStore,
    InMemoryNotificationPlatform,
    InMemoryIdentityDirectory,
    DefaultClock,
>;

/// A workspace with open and done workflow states and an unrestricted
/// administrator.
pub struct Workspace {
    pub id: WorkspaceId,
    pub store: Arc<InMemoryTaskStore>,
    pub directory: Arc<InMemoryIdentityDirectory>,
    pub platform: Arc<InMemoryNotificationPlatform>,
    pub service: TestService,
    pub open: WorkflowStateId,
    pub done: WorkflowStateId,
    pub admin: Actor,
}

/// Provides a fresh workspace for each test.
#[fixture]
pub fn workspace() -> Workspace {
    Workspace::new(EngineConfig::default())
}

impl Workspace {
    /// Builds a workspace whose directory retries happen without delay.
    ///
    /// # Panics
    ///
    /// Panics when seeding the in-memory adapters fails.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::configured(config.with_directory_retry(RetryPolicy::immediate(3)))
    }

    /// Builds a workspace using `config` as given.
    ///
    /// # Panics
    ///
    /// Panics when seeding the in-memory adapters fails.
    #[must_use]
    pub fn configured(config: EngineConfig) -> Self {
        let id = WorkspaceId::new();
        let store = Arc::new(InMemoryTaskStore::new());
        let directory = Arc::new(InMemoryIdentityDirectory::new());
        let platform = Arc::new(InMemoryNotificationPlatform::new());

        let open = WorkflowState::new(id, "In progress", WorkflowStateType::Started);
        let done = WorkflowState::new(id, "Done", WorkflowStateType::Completed);
        let (open_id, done_id) = (open.id, done.id);
        store.insert_workflow_state(open).expect("seed open state");
        store.insert_workflow_state(done).expect("seed done state");

        let admin_id = directory
            .add_internal_user(id, CompanyAccess::Unrestricted)
            .expect("seed administrator");
        let service = TaskService::new(
            Arc::clone(&store),
            Arc::clone(&directory),
            Arc::clone(&platform),
            Arc::new(DefaultClock),
            config,
        );

        Self {
            id,
            store,
            directory,
            platform,
            service,
            open: open_id,
            done: done_id,
            admin: Actor::internal_user(id, admin_id),
        }
    }

    /// Registers an unrestricted staff member.
    ///
    /// # Panics
    ///
    /// Panics when the directory rejects the seed.
    #[must_use]
    pub fn staff(&self) -> (InternalUserId, Actor) {
        let user = self
            .directory
            .add_internal_user(self.id, CompanyAccess::Unrestricted)
            .expect("seed staff");
        (user, Actor::internal_user(self.id, user))
    }

    /// Registers a company.
    ///
    /// # Panics
    ///
    /// Panics when the directory rejects the seed.
    #[must_use]
    pub fn company(&self) -> CompanyId {
        self.directory.add_company(self.id).expect("seed company")
    }

    /// Registers a client of `company_id`.
    ///
    /// # Panics
    ///
    /// Panics when the directory rejects the seed.
    #[must_use]
    pub fn client(&self, company_id: CompanyId) -> (ClientId, Actor) {
        let client = self
            .directory
            .add_client(self.id, [company_id])
            .expect("seed client");
        (client, Actor::client(self.id, client, company_id))
    }

    /// Creates an open task as the administrator.
    ///
    /// # Panics
    ///
    /// Panics when creation fails.
    pub async fn create(
        &self,
        title: &str,
        parent: Option<TaskId>,
        assignee: AssigneeFields,
    ) -> Task {
        let base = CreateTaskRequest::new(title, self.open).with_assignee(assignee);
        let request = match parent {
            Some(parent_id) => base.with_parent(parent_id),
            None => base,
        };
        self.service
            .create_task(&self.admin, request)
            .await
            .expect("task creation should succeed")
            .task
    }

    /// Current ledger rows.
    ///
    /// # Panics
    ///
    /// Panics when the store cannot be read.
    #[must_use]
    pub fn ledger(&self) -> Vec<LedgerEntry> {
        self.store.ledger_snapshot().expect("ledger snapshot")
    }
}

/// Identifiers of the tasks, in order.
#[must_use]
pub fn ids(tasks: &[Task]) -> Vec<TaskId> {
    tasks.iter().map(Task::id).collect()
}
