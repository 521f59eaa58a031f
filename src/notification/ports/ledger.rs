//! Ledger persistence port.

use crate::notification::domain::{LedgerEntry, LedgerEntryId, Recipient, RetireScope};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for ledger operations.
pub type NotificationLedgerResult<T> = Result<T, NotificationLedgerError>;

/// Storage for outstanding notifications.
#[async_trait]
pub trait NotificationLedgerRepository: Send + Sync {
    /// Inserts `entry`, atomically removing any entry already occupying the
    /// same (recipient, task) slot.
    ///
    /// Returns the displaced entries so the caller can withdraw them on the
    /// platform.
    async fn replace_outstanding(
        &self,
        entry: LedgerEntry,
    ) -> NotificationLedgerResult<Vec<LedgerEntry>>;

    /// Behaves like [`Self::replace_outstanding`] while the entry's task is
    /// live and still at `revision`, checked atomically with the write.
    ///
    /// Returns `None`, writing nothing, once the task has moved on.
    async fn replace_outstanding_if_current(
        &self,
        entry: LedgerEntry,
        revision: u64,
    ) -> NotificationLedgerResult<Option<Vec<LedgerEntry>>>;

    /// Returns the entries inside a retirement scope.
    async fn find_matching(&self, scope: &RetireScope)
    -> NotificationLedgerResult<Vec<LedgerEntry>>;

    /// Returns the entries for a task.
    async fn find_by_task(&self, task_id: TaskId) -> NotificationLedgerResult<Vec<LedgerEntry>>;

    /// Returns the entries held by any of the recipients.
    async fn find_by_recipients(
        &self,
        recipients: &[Recipient],
    ) -> NotificationLedgerResult<Vec<LedgerEntry>>;

    /// Removes entries by identifier, returning how many rows existed.
    async fn remove_entries(&self, ids: &[LedgerEntryId]) -> NotificationLedgerResult<usize>;
}

/// Errors returned by ledger repositories.
#[derive(Debug, Clone, Error)]
pub enum NotificationLedgerError {
    /// A stored row could not be decoded.
    #[error("corrupt ledger row {entry_id}: {reason}")]
    CorruptRow {
        /// Offending row.
        entry_id: LedgerEntryId,
        /// Decoding failure.
        reason: String,
    },

    /// Persistence-layer failure.
    #[error("ledger persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotificationLedgerError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
