//! Shared wiring for the `PostgreSQL` adapter tests.

pub use super::cluster::{BoxError, PostgresCluster, postgres_cluster};
use super::cluster::{ManagedCluster, TemporaryDatabase};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use rstest::fixture;
use std::future::Future;
use std::sync::Arc;
use taskshare::config::{EngineConfig, RetryPolicy};
use taskshare::directory::{
    adapters::memory::InMemoryIdentityDirectory,
    domain::{ClientId, CompanyAccess, CompanyId, WorkspaceId},
};
use taskshare::notification::{
    adapters::memory::InMemoryNotificationPlatform, domain::LedgerEntry,
    ports::NotificationLedgerRepository,
};
use taskshare::task::{
    adapters::postgres::PostgresTaskStore,
    domain::{
        Actor, AssigneeFields, Task, TaskId, WorkflowState, WorkflowStateId, WorkflowStateType,
    },
    services::{CreateTaskRequest, TaskService},
};
use tokio::runtime::Runtime;
use uuid::Uuid;

/// Schema applied to the template database.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-03-01-000000_create_task_visibility_tables/up.sql");

/// Template database holding the migrated schema.
pub const TEMPLATE_DB: &str = "taskshare_test_template";

/// Service type wired over the `PostgreSQL` store.
pub type PgService = TaskService<
    PostgresTaskStore,
    InMemoryNotificationPlatform,
    InMemoryIdentityDirectory,
    DefaultClock,
>;

/// Builds the runtime the synchronous fixtures drive async calls on.
///
/// # Errors
///
/// Returns an error if the runtime cannot be built.
pub fn test_runtime() -> Result<Runtime, BoxError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| Box::new(err) as BoxError)
}

/// Ensures the template database exists with the schema applied.
///
/// # Errors
///
/// Returns an error if template creation or migration fails.
pub fn ensure_template(cluster: &ManagedCluster) -> Result<(), BoxError> {
    cluster.ensure_template_exists(TEMPLATE_DB, |url| {
        let mut connection =
            PgConnection::establish(url).map_err(|err| Box::new(err) as BoxError)?;
        connection
            .batch_execute(CREATE_SCHEMA_SQL)
            .map_err(|err| Box::new(err) as BoxError)
    })
}

/// A migrated database with a task service and seeded workflow states.
///
/// Fields drop in order, so the pool closes before the database is dropped.
pub struct PgWorkspace {
    pub id: WorkspaceId,
    pub service: PgService,
    pub store: Arc<PostgresTaskStore>,
    pub directory: Arc<InMemoryIdentityDirectory>,
    pub platform: Arc<InMemoryNotificationPlatform>,
    pub open: WorkflowStateId,
    pub done: WorkflowStateId,
    pub admin: Actor,
    pub rt: Runtime,
    database: TemporaryDatabase,
}

impl PgWorkspace {
    fn prepare(cluster: PostgresCluster) -> Result<Self, BoxError> {
        ensure_template(cluster)?;
        let database = cluster
            .temporary_database_from_template(&format!("test_{}", Uuid::new_v4()), TEMPLATE_DB)?;
        let pool = Pool::builder()
            .max_size(4)
            .build(ConnectionManager::<PgConnection>::new(database.url()))
            .map_err(|err| Box::new(err) as BoxError)?;
        let store = Arc::new(PostgresTaskStore::new(pool));
        let rt = test_runtime()?;

        let id = WorkspaceId::new();
        let open = WorkflowState::new(id, "In progress", WorkflowStateType::Started);
        let done = WorkflowState::new(id, "Done", WorkflowStateType::Completed);
        let (open_id, done_id) = (open.id, done.id);
        rt.block_on(async {
            store.insert_workflow_state(open).await?;
            store.insert_workflow_state(done).await
        })
        .map_err(|err| Box::new(err) as BoxError)?;

        let directory = Arc::new(InMemoryIdentityDirectory::new());
        let platform = Arc::new(InMemoryNotificationPlatform::new());
        let admin_id = directory
            .add_internal_user(id, CompanyAccess::Unrestricted)
            .map_err(|err| Box::new(err) as BoxError)?;
        let service = TaskService::new(
            Arc::clone(&store),
            Arc::clone(&directory),
            Arc::clone(&platform),
            Arc::new(DefaultClock),
            EngineConfig::default().with_directory_retry(RetryPolicy::immediate(3)),
        );

        Ok(Self {
            id,
            service,
            store,
            directory,
            platform,
            open: open_id,
            done: done_id,
            admin: Actor::internal_user(id, admin_id),
            rt,
            database,
        })
    }

    /// Runs `future` to completion on the workspace runtime.
    pub fn run<F: Future>(&self, future: F) -> F::Output {
        self.rt.block_on(future)
    }

    /// URL of this workspace's database.
    #[must_use]
    pub fn database_url(&self) -> String {
        self.database.url()
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
    pub fn create(&self, title: &str, parent: Option<TaskId>, assignee: AssigneeFields) -> Task {
        let base = CreateTaskRequest::new(title, self.open).with_assignee(assignee);
        let request = match parent {
            Some(parent_id) => base.with_parent(parent_id),
            None => base,
        };
        self.run(self.service.create_task(&self.admin, request))
            .expect("task creation should succeed")
            .task
    }

    /// Outstanding ledger rows for `task_id`.
    ///
    /// # Panics
    ///
    /// Panics when the ledger cannot be read.
    #[must_use]
    pub fn ledger_for(&self, task_id: TaskId) -> Vec<LedgerEntry> {
        self.run(self.store.find_by_task(task_id))
            .expect("ledger lookup")
    }
}

/// A prepared workspace, or `None` when this host cannot run the cluster.
///
/// # Panics
///
/// Panics when the cluster is running but the workspace cannot be prepared.
#[fixture]
pub fn pg_workspace(postgres_cluster: Result<PostgresCluster, BoxError>) -> Option<PgWorkspace> {
    let cluster = match postgres_cluster {
        Ok(cluster) => cluster,
        Err(err) => {
            tracing::warn!(error = %err, "embedded PostgreSQL unavailable; skipping");
            return None;
        }
    };
    Some(PgWorkspace::prepare(cluster).expect("prepare PostgreSQL workspace"))
}
