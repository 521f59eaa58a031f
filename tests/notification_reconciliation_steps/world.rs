//! Shared world state for notification reconciliation BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use taskshare::config::{EngineConfig, RetryPolicy};
use taskshare::directory::{
    adapters::memory::InMemoryIdentityDirectory,
    domain::{ClientId, CompanyId, InternalUserId, WorkspaceId},
};
use taskshare::notification::adapters::memory::InMemoryNotificationPlatform;
use taskshare::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{Actor, Task, WorkflowStateId},
    services::TaskService,
};

/// Service type used by the BDD world.
pub type TestTaskService = TaskService<
    InMemoryTaskStore,
    InMemoryNotificationPlatform,
    InMemoryIdentityDirectory,
    DefaultClock,
>;

/// Workflow states and administrator seeded by the workspace step.
#[derive(Debug, Clone)]
pub struct SeededWorkspace {
    pub id: WorkspaceId,
    pub open: WorkflowStateId,
    pub done: WorkflowStateId,
    pub admin_id: InternalUserId,
    pub admin: Actor,
}

/// Scenario world for notification reconciliation behaviour tests.
pub struct ReconciliationWorld {
    pub store: Arc<InMemoryTaskStore>,
    pub directory: Arc<InMemoryIdentityDirectory>,
    pub platform: Arc<InMemoryNotificationPlatform>,
    pub service: TestTaskService,
    pub workspace: Option<SeededWorkspace>,
    pub company: Option<CompanyId>,
    pub clients: Vec<ClientId>,
    pub staff: Option<InternalUserId>,
    pub task: Option<Task>,
}

impl ReconciliationWorld {
    /// Creates a world with empty adapters.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let directory = Arc::new(InMemoryIdentityDirectory::new());
        let platform = Arc::new(InMemoryNotificationPlatform::new());
        let service = TaskService::new(
            Arc::clone(&store),
            Arc::clone(&directory),
            Arc::clone(&platform),
            Arc::new(DefaultClock),
            EngineConfig::default().with_directory_retry(RetryPolicy::immediate(3)),
        );

        Self {
            store,
            directory,
            platform,
            service,
            workspace: None,
            company: None,
            clients: Vec::new(),
            staff: None,
            task: None,
        }
    }

    /// Returns the seeded workspace.
    ///
    /// # Errors
    ///
    /// Returns an error when the workspace step has not run.
    pub fn seeded(&self) -> Result<&SeededWorkspace, eyre::Report> {
        self.workspace
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing workspace in scenario world"))
    }

    /// Returns the scenario's company.
    ///
    /// # Errors
    ///
    /// Returns an error when no company was seeded.
    pub fn company(&self) -> Result<CompanyId, eyre::Report> {
        self.company
            .ok_or_else(|| eyre::eyre!("missing company in scenario world"))
    }

    /// Returns the client at a one-based position.
    ///
    /// # Errors
    ///
    /// Returns an error when no such client was seeded.
    pub fn client(&self, position: usize) -> Result<ClientId, eyre::Report> {
        position
            .checked_sub(1)
            .and_then(|index| self.clients.get(index))
            .copied()
            .ok_or_else(|| eyre::eyre!("no client {position} in scenario world"))
    }

    /// Returns the task under test.
    ///
    /// # Errors
    ///
    /// Returns an error when no task was created.
    pub fn task(&self) -> Result<&Task, eyre::Report> {
        self.task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }
}

impl Default for ReconciliationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ReconciliationWorld {
    ReconciliationWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
