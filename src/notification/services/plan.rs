//! Pure planning of notification side effects for task lifecycle events.
//!
//! Planning happens before the task mutation commits so the ledger rows it
//! retires can be removed in the same storage transaction. Execution happens
//! afterwards and only touches the platform and the ledger's new rows.

use crate::directory::domain::{CompanyId, WorkspaceId};
use crate::notification::domain::{
    LedgerEntry, LedgerEntryId, NotificationKind, NotificationPayload, Recipient, RetireMode,
    TaskSnapshot,
};
use crate::task::domain::{ActorId, Assignee, Task, TaskId};

/// Who a notification step addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The task assignee; a company expands to its member clients.
    Assignee(Assignee),
    /// Internal users whose company access covers the company.
    InternalUsersWithAccess(CompanyId),
}

/// One notification fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyStep {
    /// Addressed audience.
    pub audience: Audience,
    /// Notification kind.
    pub kind: NotificationKind,
    /// Individuals never notified by this step.
    pub suppress: Vec<ActorId>,
    /// Skip recipients already holding an outstanding entry for the task.
    pub skip_outstanding: bool,
}

impl NotifyStep {
    /// Returns `true` when the recipient is suppressed.
    #[must_use]
    pub fn suppresses(&self, recipient: &Recipient) -> bool {
        self.suppress.iter().any(|actor| recipient.is_actor(*actor))
    }
}

/// An ordered side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileStep {
    /// Withdraw entries. Their local rows are removed by the task commit.
    Release {
        /// Entries being retired.
        entries: Vec<LedgerEntry>,
        /// Platform withdrawal mode.
        mode: RetireMode,
    },
    /// Issue notifications and record them in the ledger.
    Notify(NotifyStep),
}

/// Side effects of one task mutation, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    workspace_id: WorkspaceId,
    task_id: TaskId,
    title: String,
    actor: ActorId,
    revision: u64,
    observed: Vec<LedgerEntryId>,
    steps: Vec<ReconcileStep>,
}

impl ReconcilePlan {
    pub(crate) fn new(task: &Task, actor: ActorId, steps: Vec<ReconcileStep>) -> Self {
        Self {
            workspace_id: task.workspace_id(),
            task_id: task.id(),
            title: task.title().to_owned(),
            actor,
            revision: task.revision(),
            observed: Vec::new(),
            steps,
        }
    }

    /// Records the ledger rows the plan was computed from.
    pub(crate) fn observing(mut self, entries: &[LedgerEntry]) -> Self {
        self.observed = entries.iter().map(|entry| entry.id).collect();
        self
    }

    /// Task the plan is about.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Workspace owning the task.
    #[must_use]
    pub const fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    /// Task revision the plan's notifications belong to. Entries are only
    /// recorded while the stored task is still at this revision.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Ledger rows read while planning.
    #[must_use]
    pub fn observed(&self) -> &[LedgerEntryId] {
        &self.observed
    }

    /// Ordered steps.
    #[must_use]
    pub fn steps(&self) -> &[ReconcileStep] {
        &self.steps
    }

    /// Returns `true` when the mutation has no notification side effects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Ledger rows the task commit must remove.
    #[must_use]
    pub fn ledger_removals(&self) -> Vec<LedgerEntryId> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                ReconcileStep::Release { entries, .. } => Some(entries),
                ReconcileStep::Notify(_) => None,
            })
            .flatten()
            .map(|entry| entry.id)
            .collect()
    }

    pub(crate) fn payload(&self, kind: NotificationKind) -> NotificationPayload {
        NotificationPayload {
            kind,
            workspace_id: self.workspace_id,
            task_id: self.task_id,
            title: self.title.clone(),
            actor: self.actor,
        }
    }
}

/// Accumulates steps while tracking which outstanding entries are still
/// unclaimed, so no entry is released twice.
struct StepBuilder {
    steps: Vec<ReconcileStep>,
    outstanding: Vec<LedgerEntry>,
}

impl StepBuilder {
    const fn new(outstanding: Vec<LedgerEntry>) -> Self {
        Self {
            steps: Vec::new(),
            outstanding,
        }
    }

    fn release_where(&mut self, mode: RetireMode, predicate: impl Fn(&LedgerEntry) -> bool) {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.outstanding)
            .into_iter()
            .partition(|entry| predicate(entry));
        self.outstanding = kept;
        if !taken.is_empty() {
            self.steps.push(ReconcileStep::Release {
                entries: taken,
                mode,
            });
        }
    }

    fn notify(&mut self, step: NotifyStep) {
        self.steps.push(ReconcileStep::Notify(step));
    }

    fn finish(self) -> Vec<ReconcileStep> {
        self.steps
    }
}

/// The notification an assignee receives when a task newly becomes theirs
/// to act on. The actor is never notified, and neither is an individual
/// assignee who created the task themselves.
fn assignment_notice(
    assignee: Assignee,
    actor: ActorId,
    created_by: ActorId,
    skip_outstanding: bool,
) -> NotifyStep {
    let mut suppress = vec![actor];
    if created_by != actor && assignee.is_identity(created_by) {
        suppress.push(created_by);
    }
    NotifyStep {
        audience: Audience::Assignee(assignee),
        kind: NotificationKind::Assigned,
        suppress,
        skip_outstanding,
    }
}

/// Steps for a freshly created task.
#[must_use]
pub fn plan_created(after: &TaskSnapshot, actor: ActorId) -> Vec<ReconcileStep> {
    match after.assignee() {
        Some(assignee) if !after.is_completed() && !after.is_archived() => vec![
            ReconcileStep::Notify(assignment_notice(
                *assignee,
                actor,
                after.task.created_by(),
                false,
            )),
        ],
        _ => Vec::new(),
    }
}

/// Steps for an update, given the task's outstanding entries.
///
/// Reassignment effects come first, then workflow effects, then archive
/// effects.
#[must_use]
pub fn plan_updated(
    before: &TaskSnapshot,
    after: &TaskSnapshot,
    actor: ActorId,
    outstanding: Vec<LedgerEntry>,
    renotify_existing: bool,
) -> Vec<ReconcileStep> {
    let previous = before.assignee().copied();
    let current = after.assignee().copied();
    let reassigned = previous != current;
    let notifiable = !after.is_completed() && !after.is_archived();
    let created_by = after.task.created_by();
    let mut builder = StepBuilder::new(outstanding);
    let mut assignment_notified = false;

    if reassigned {
        if let Some(previous) = previous {
            let mode = match previous {
                Assignee::InternalUser { .. } => RetireMode::Delete,
                Assignee::Client { .. } | Assignee::Company { .. } => RetireMode::MarkRead,
            };
            builder.release_where(mode, |entry| entry.recipient.belongs_to(&previous));
        }
        if let Some(current) = current {
            if notifiable {
                builder.notify(NotifyStep {
                    audience: Audience::Assignee(current),
                    kind: NotificationKind::Assigned,
                    suppress: vec![actor],
                    skip_outstanding: false,
                });
                assignment_notified = true;
            }
        }
    }

    let Some(current) = current else {
        return builder.finish();
    };

    if !before.is_completed() && after.is_completed() {
        match current {
            Assignee::InternalUser { .. } => {
                builder.release_where(RetireMode::Delete, |entry| {
                    entry.recipient.belongs_to(&current)
                });
            }
            Assignee::Client { company_id, .. } | Assignee::Company { company_id } => {
                builder.notify(NotifyStep {
                    audience: Audience::InternalUsersWithAccess(company_id),
                    kind: NotificationKind::Completed,
                    suppress: vec![actor],
                    skip_outstanding: false,
                });
                builder.release_where(RetireMode::MarkRead, |entry| {
                    entry.recipient.belongs_to(&current)
                });
            }
        }
    } else if before.is_completed() && !after.is_completed() {
        builder.release_where(RetireMode::Delete, |entry| {
            entry.kind == NotificationKind::Completed
                && matches!(entry.recipient, Recipient::InternalUser { .. })
        });
        if notifiable && !assignment_notified {
            builder.notify(assignment_notice(
                current,
                actor,
                created_by,
                !renotify_existing,
            ));
            assignment_notified = true;
        }
    }

    if !before.is_archived() && after.is_archived() {
        builder.release_where(RetireMode::MarkRead, |entry| {
            entry.recipient.belongs_to(&current)
        });
    } else if before.is_archived() && !after.is_archived() && notifiable && !assignment_notified {
        builder.notify(assignment_notice(
            current,
            actor,
            created_by,
            !renotify_existing,
        ));
    }

    builder.finish()
}

/// Steps for a deletion: every entry of the task and its descendants is
/// deleted on the platform.
#[must_use]
pub fn plan_deleted(outstanding: Vec<LedgerEntry>) -> Vec<ReconcileStep> {
    let mut builder = StepBuilder::new(outstanding);
    builder.release_where(RetireMode::Delete, |_| true);
    builder.finish()
}
