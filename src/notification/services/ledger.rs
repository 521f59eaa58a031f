//! Ledger bookkeeping on top of the repository and platform ports.

use super::fanout::fan_out;
use crate::notification::{
    domain::{
        ExternalNotificationId, LedgerEntry, NotificationKind, Recipient, RetireMode, RetireScope,
    },
    ports::{
        NotificationLedgerRepository, NotificationLedgerResult, NotificationPlatform,
        NotificationPlatformResult,
    },
};
use crate::task::domain::TaskId;
use mockable::Clock;
use std::sync::Arc;
use tracing::warn;

/// Outcome of a retirement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetireOutcome {
    /// Local rows removed.
    pub retired: usize,
    /// Platform calls that failed and were only logged.
    pub platform_failures: usize,
}

/// Keeps at most one outstanding notification per (recipient, task) pair.
///
/// Platform failures never undo local changes: a stale remote notification
/// is tolerated, a stale local row is not.
#[derive(Clone)]
pub struct NotificationLedger<L, P, C>
where
    L: NotificationLedgerRepository,
    P: NotificationPlatform,
    C: Clock + Send + Sync,
{
    repository: Arc<L>,
    platform: Arc<P>,
    clock: Arc<C>,
    concurrency: usize,
}

impl<L, P, C> NotificationLedger<L, P, C>
where
    L: NotificationLedgerRepository,
    P: NotificationPlatform,
    C: Clock + Send + Sync,
{
    /// Creates a ledger service issuing at most `concurrency` platform calls
    /// at once.
    #[must_use]
    pub const fn new(
        repository: Arc<L>,
        platform: Arc<P>,
        clock: Arc<C>,
        concurrency: usize,
    ) -> Self {
        Self {
            repository,
            platform,
            clock,
            concurrency,
        }
    }

    /// Records a notification, retiring whatever the recipient already held
    /// for the task.
    ///
    /// The displaced entry is removed locally in the same repository call and
    /// then marked read on the platform.
    ///
    /// # Errors
    ///
    /// Returns the repository error when the row cannot be written.
    pub async fn upsert(
        &self,
        recipient: Recipient,
        task_id: TaskId,
        external_id: ExternalNotificationId,
        kind: NotificationKind,
    ) -> NotificationLedgerResult<LedgerEntry> {
        let entry = LedgerEntry::issued(recipient, task_id, external_id, kind, &*self.clock);
        let displaced = self.repository.replace_outstanding(entry.clone()).await?;
        if !displaced.is_empty() {
            self.release_remote(&displaced, RetireMode::MarkRead).await;
        }
        Ok(entry)
    }

    /// Records a notification like [`Self::upsert`], but only while the task
    /// is still at `revision`.
    ///
    /// Returns `None`, writing nothing, when a later mutation has already
    /// superseded the notification.
    ///
    /// # Errors
    ///
    /// Returns the repository error when the row cannot be written.
    pub async fn upsert_if_current(
        &self,
        recipient: Recipient,
        task_id: TaskId,
        revision: u64,
        external_id: ExternalNotificationId,
        kind: NotificationKind,
    ) -> NotificationLedgerResult<Option<LedgerEntry>> {
        let entry = LedgerEntry::issued(recipient, task_id, external_id, kind, &*self.clock);
        let Some(displaced) = self
            .repository
            .replace_outstanding_if_current(entry.clone(), revision)
            .await?
        else {
            return Ok(None);
        };
        if !displaced.is_empty() {
            self.release_remote(&displaced, RetireMode::MarkRead).await;
        }
        Ok(Some(entry))
    }

    /// Marks a delivered but unrecorded notification read so it does not
    /// linger on the platform.
    pub async fn withdraw_unrecorded(&self, external_id: &ExternalNotificationId) {
        if let Err(err) = self.platform.mark_notification_read(external_id).await {
            warn!(%external_id, error = %err, "failed to withdraw superseded notification");
        }
    }

    /// Withdraws every entry in `scope` on the platform, then removes the
    /// local rows.
    ///
    /// # Errors
    ///
    /// Returns the repository error when rows cannot be read or removed.
    pub async fn retire(
        &self,
        scope: &RetireScope,
        mode: RetireMode,
    ) -> NotificationLedgerResult<RetireOutcome> {
        let entries = self.repository.find_matching(scope).await?;
        if entries.is_empty() {
            return Ok(RetireOutcome::default());
        }
        let platform_failures = self.release_remote(&entries, mode).await;
        let ids: Vec<_> = entries.iter().map(|entry| entry.id).collect();
        let retired = self.repository.remove_entries(&ids).await?;
        Ok(RetireOutcome {
            retired,
            platform_failures,
        })
    }

    /// Withdraws entries on the platform only, for rows already removed
    /// locally. Returns the number of failed platform calls.
    pub async fn release_remote(&self, entries: &[LedgerEntry], mode: RetireMode) -> usize {
        let outcomes = fan_out(entries.iter().collect(), self.concurrency, |entry| {
            self.withdraw(entry, mode)
        })
        .await;
        outcomes.into_iter().filter(Result::is_err).count()
    }

    /// Returns the outstanding entries for a task.
    ///
    /// # Errors
    ///
    /// Returns the repository error.
    pub async fn find_by_task(
        &self,
        task_id: TaskId,
    ) -> NotificationLedgerResult<Vec<LedgerEntry>> {
        self.repository.find_by_task(task_id).await
    }

    /// Returns the outstanding entries held by any of the recipients.
    ///
    /// # Errors
    ///
    /// Returns the repository error.
    pub async fn find_by_recipients(
        &self,
        recipients: &[Recipient],
    ) -> NotificationLedgerResult<Vec<LedgerEntry>> {
        self.repository.find_by_recipients(recipients).await
    }

    async fn withdraw(
        &self,
        entry: &LedgerEntry,
        mode: RetireMode,
    ) -> NotificationPlatformResult<()> {
        let outcome = match mode {
            RetireMode::MarkRead => self.platform.mark_notification_read(&entry.external_id).await,
            RetireMode::Delete => self.platform.delete_notification(&entry.external_id).await,
        };
        if let Err(err) = &outcome {
            warn!(
                entry_id = %entry.id,
                external_id = %entry.external_id,
                recipient = %entry.recipient,
                task_id = %entry.task_id,
                ?mode,
                error = %err,
                "failed to withdraw notification on platform"
            );
        }
        outcome
    }
}
