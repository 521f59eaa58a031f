//! Drives ledger and platform side effects for task lifecycle events.

use super::{
    NotificationLedger,
    fanout::fan_out,
    plan::{
        Audience, NotifyStep, ReconcilePlan, ReconcileStep, plan_created, plan_deleted,
        plan_updated,
    },
};
use crate::config::EngineConfig;
use crate::directory::{
    domain::{DirectoryFilter, WorkspaceId},
    ports::{DirectoryResult, IdentityDirectory},
    services::with_retry,
};
use crate::notification::{
    domain::{NotificationPayload, Recipient, TaskLifecycleEvent},
    ports::{NotificationLedgerRepository, NotificationLedgerResult, NotificationPlatform},
};
use crate::task::domain::{ActorId, Assignee, TaskId};
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a plan execution achieved. Failures are logged, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Recipients that received a notification and a ledger entry.
    pub notified: Vec<Recipient>,
    /// Entries withdrawn on the platform.
    pub withdrawn: usize,
    /// Directory, platform, or ledger failures, plus deliveries withdrawn
    /// because the task changed before they were recorded.
    pub failures: usize,
}

/// Notification state machine over the ledger, platform, and directory.
#[derive(Clone)]
pub struct NotificationReconciler<L, P, D, C>
where
    L: NotificationLedgerRepository,
    P: NotificationPlatform,
    D: IdentityDirectory,
    C: Clock + Send + Sync,
{
    ledger: NotificationLedger<L, P, C>,
    platform: Arc<P>,
    directory: Arc<D>,
    config: EngineConfig,
}

impl<L, P, D, C> NotificationReconciler<L, P, D, C>
where
    L: NotificationLedgerRepository,
    P: NotificationPlatform,
    D: IdentityDirectory,
    C: Clock + Send + Sync,
{
    /// Creates a reconciler.
    #[must_use]
    pub fn new(
        repository: Arc<L>,
        platform: Arc<P>,
        directory: Arc<D>,
        clock: Arc<C>,
        config: EngineConfig,
    ) -> Self {
        let ledger = NotificationLedger::new(
            repository,
            Arc::clone(&platform),
            clock,
            config.fanout_concurrency,
        );
        Self {
            ledger,
            platform,
            directory,
            config,
        }
    }

    /// The underlying ledger service.
    #[must_use]
    pub const fn ledger(&self) -> &NotificationLedger<L, P, C> {
        &self.ledger
    }

    /// Plans the side effects of an event performed by `actor`.
    ///
    /// # Errors
    ///
    /// Returns the ledger error when outstanding entries cannot be read.
    pub async fn plan(
        &self,
        event: &TaskLifecycleEvent,
        actor: ActorId,
    ) -> NotificationLedgerResult<ReconcilePlan> {
        let (steps, observed) = match event {
            TaskLifecycleEvent::Created(after) => (plan_created(after, actor), Vec::new()),
            TaskLifecycleEvent::Updated { before, after } => {
                let outstanding = self.ledger.find_by_task(after.task.id()).await?;
                let steps = plan_updated(
                    before,
                    after,
                    actor,
                    outstanding.clone(),
                    self.config.renotify_existing,
                );
                (steps, outstanding)
            }
            TaskLifecycleEvent::Deleted { task, descendants } => {
                let mut outstanding = self.ledger.find_by_task(task.id()).await?;
                for descendant in descendants {
                    outstanding.extend(self.ledger.find_by_task(descendant.id()).await?);
                }
                (plan_deleted(outstanding.clone()), outstanding)
            }
        };
        let plan = ReconcilePlan::new(event.task(), actor, steps).observing(&observed);
        debug!(
            task_id = %plan.task_id(),
            steps = plan.steps().len(),
            "planned notification reconciliation"
        );
        Ok(plan)
    }

    /// Executes a plan after the task mutation has committed.
    ///
    /// Each recipient is handled independently; a failure is logged and the
    /// remaining recipients still proceed. A recipient is notified at most
    /// once per plan.
    pub async fn execute(&self, plan: &ReconcilePlan) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut notified = BTreeSet::new();
        for step in plan.steps() {
            match step {
                ReconcileStep::Release { entries, mode } => {
                    let failures = self.ledger.release_remote(entries, *mode).await;
                    report.withdrawn += entries.len().saturating_sub(failures);
                    report.failures += failures;
                }
                ReconcileStep::Notify(notify) => {
                    self.notify(plan, notify, &mut notified, &mut report).await;
                }
            }
        }
        report
    }

    async fn notify(
        &self,
        plan: &ReconcilePlan,
        step: &NotifyStep,
        notified: &mut BTreeSet<Recipient>,
        report: &mut ReconcileReport,
    ) {
        let audience = match self.expand(plan.workspace_id(), &step.audience).await {
            Ok(audience) => audience,
            Err(err) => {
                warn!(
                    task_id = %plan.task_id(),
                    audience = ?step.audience,
                    error = %err,
                    "could not resolve notification audience"
                );
                report.failures += 1;
                return;
            }
        };

        let outstanding = if step.skip_outstanding {
            self.outstanding_recipients(plan.task_id()).await
        } else {
            BTreeSet::new()
        };
        let recipients: Vec<_> = audience
            .into_iter()
            .filter(|recipient| !step.suppresses(recipient))
            .filter(|recipient| !outstanding.contains(&recipient.recipient_id()))
            .filter(|recipient| notified.insert(*recipient))
            .collect();
        if recipients.is_empty() {
            return;
        }

        let payload = plan.payload(step.kind);
        let outcomes = fan_out(recipients, self.config.fanout_concurrency, |recipient| {
            self.deliver(recipient, &payload, plan.revision())
        })
        .await;
        for outcome in outcomes {
            match outcome {
                Some(recipient) => report.notified.push(recipient),
                None => report.failures += 1,
            }
        }
    }

    async fn deliver(
        &self,
        recipient: Recipient,
        payload: &NotificationPayload,
        revision: u64,
    ) -> Option<Recipient> {
        let external_id = match self.platform.create_notification(&recipient, payload).await {
            Ok(id) => id,
            Err(err) => {
                warn!(
                    %recipient,
                    task_id = %payload.task_id,
                    kind = %payload.kind,
                    error = %err,
                    "failed to deliver notification"
                );
                return None;
            }
        };
        match self
            .ledger
            .upsert_if_current(
                recipient,
                payload.task_id,
                revision,
                external_id.clone(),
                payload.kind,
            )
            .await
        {
            Ok(Some(_)) => Some(recipient),
            Ok(None) => {
                debug!(
                    %recipient,
                    task_id = %payload.task_id,
                    %external_id,
                    "task changed before the notification was recorded; withdrawing it"
                );
                self.ledger.withdraw_unrecorded(&external_id).await;
                None
            }
            Err(err) => {
                warn!(
                    %recipient,
                    task_id = %payload.task_id,
                    %external_id,
                    error = %err,
                    "delivered notification could not be recorded in the ledger"
                );
                None
            }
        }
    }

    async fn outstanding_recipients(&self, task_id: TaskId) -> BTreeSet<uuid::Uuid> {
        match self.ledger.find_by_task(task_id).await {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| entry.recipient.recipient_id())
                .collect(),
            Err(err) => {
                warn!(%task_id, error = %err, "could not read outstanding notifications");
                BTreeSet::new()
            }
        }
    }

    async fn expand(
        &self,
        workspace_id: WorkspaceId,
        audience: &Audience,
    ) -> DirectoryResult<Vec<Recipient>> {
        let policy = &self.config.directory_retry;
        match *audience {
            Audience::Assignee(Assignee::InternalUser { internal_user_id }) => {
                Ok(vec![Recipient::internal_user(internal_user_id)])
            }
            Audience::Assignee(Assignee::Client {
                client_id,
                company_id,
            }) => Ok(vec![Recipient::client(client_id, company_id)]),
            Audience::Assignee(Assignee::Company { company_id }) => {
                let filter = DirectoryFilter::company(workspace_id, company_id);
                let members = with_retry(policy, "list_clients", || {
                    self.directory.list_clients(&filter)
                })
                .await?;
                Ok(members
                    .into_iter()
                    .map(|client| Recipient::client(client.id, company_id))
                    .collect())
            }
            Audience::InternalUsersWithAccess(company_id) => {
                let filter = DirectoryFilter::company(workspace_id, company_id);
                let users = with_retry(policy, "list_internal_users", || {
                    self.directory.list_internal_users(&filter)
                })
                .await?;
                Ok(users
                    .into_iter()
                    .map(|user| Recipient::internal_user(user.id))
                    .collect())
            }
        }
    }
}
