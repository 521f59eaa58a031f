//! Retirement scopes for ledger entries.

use super::{LedgerEntry, LedgerEntryId, Recipient};
use crate::directory::domain::CompanyId;
use crate::task::domain::TaskId;
use std::collections::BTreeSet;

/// Selects the ledger entries to retire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetireScope {
    /// A single entry.
    Entry(LedgerEntryId),
    /// Every entry for a task.
    Task(TaskId),
    /// Entries held by the listed recipients on behalf of a company, across
    /// all tasks.
    CompanyRecipients {
        /// Company whose notifications are withdrawn.
        company_id: CompanyId,
        /// Affected recipients.
        recipients: BTreeSet<Recipient>,
    },
}

impl RetireScope {
    /// Returns `true` when the entry falls inside the scope.
    #[must_use]
    pub fn covers(&self, entry: &LedgerEntry) -> bool {
        match self {
            Self::Entry(id) => entry.id == *id,
            Self::Task(task_id) => entry.task_id == *task_id,
            Self::CompanyRecipients {
                company_id,
                recipients,
            } => {
                entry.recipient.company_id() == Some(*company_id)
                    && recipients.contains(&entry.recipient)
            }
        }
    }
}

/// How a retired notification is withdrawn on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetireMode {
    /// Mark as read; the recipient keeps it in their history.
    MarkRead,
    /// Remove permanently.
    Delete,
}
