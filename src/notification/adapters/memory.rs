//! In-memory notification platform for tests and local wiring.

use crate::notification::{
    domain::{ExternalNotificationId, NotificationKind, NotificationPayload, Recipient},
    ports::{NotificationPlatform, NotificationPlatformError, NotificationPlatformResult},
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

/// A platform call observed by [`InMemoryNotificationPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    /// `create_notification`, successful or not.
    Create {
        /// Target recipient.
        recipient: Recipient,
        /// Notification kind.
        kind: NotificationKind,
        /// Issued identifier; `None` when the call failed.
        issued: Option<ExternalNotificationId>,
    },
    /// `mark_notification_read`.
    MarkRead(ExternalNotificationId),
    /// `delete_notification`.
    Delete(ExternalNotificationId),
}

/// Thread-safe recording notification platform.
///
/// Issues sequential identifiers, records every call, and can be told to
/// fail deliveries to specific recipients or every withdrawal.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationPlatform {
    state: Arc<RwLock<PlatformState>>,
}

#[derive(Debug, Default)]
struct PlatformState {
    calls: Vec<PlatformCall>,
    failing_recipients: BTreeSet<Recipient>,
    failing_withdrawals: bool,
    next_id: u64,
}

fn lock_failure(err: impl ToString) -> NotificationPlatformError {
    NotificationPlatformError::unavailable(std::io::Error::other(err.to_string()))
}

fn injected(reason: &'static str) -> NotificationPlatformError {
    NotificationPlatformError::unavailable(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        reason,
    ))
}

impl InMemoryNotificationPlatform {
    /// Creates a platform with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery to `recipient` fail as unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationPlatformError::Unavailable`] when lock
    /// acquisition fails.
    pub fn fail_deliveries_to(&self, recipient: Recipient) -> NotificationPlatformResult<()> {
        self.write()?.failing_recipients.insert(recipient);
        Ok(())
    }

    /// Makes every `mark_notification_read` and `delete_notification` call
    /// fail as unavailable. Failed calls are still recorded.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationPlatformError::Unavailable`] when lock
    /// acquisition fails.
    pub fn fail_withdrawals(&self) -> NotificationPlatformResult<()> {
        self.write()?.failing_withdrawals = true;
        Ok(())
    }

    /// Returns every call observed so far, in order.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationPlatformError::Unavailable`] when lock
    /// acquisition fails.
    pub fn calls(&self) -> NotificationPlatformResult<Vec<PlatformCall>> {
        let state = self.state.read().map_err(lock_failure)?;
        Ok(state.calls.clone())
    }

    /// Returns the recipients of successful `create_notification` calls.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationPlatformError::Unavailable`] when lock
    /// acquisition fails.
    pub fn delivered(&self) -> NotificationPlatformResult<Vec<(Recipient, NotificationKind)>> {
        Ok(self
            .calls()?
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::Create {
                    recipient,
                    kind,
                    issued: Some(_),
                } => Some((recipient, kind)),
                _ => None,
            })
            .collect())
    }

    /// Returns identifiers passed to `mark_notification_read`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationPlatformError::Unavailable`] when lock
    /// acquisition fails.
    pub fn marked_read(&self) -> NotificationPlatformResult<Vec<ExternalNotificationId>> {
        Ok(self
            .calls()?
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::MarkRead(id) => Some(id),
                _ => None,
            })
            .collect())
    }

    /// Returns identifiers passed to `delete_notification`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationPlatformError::Unavailable`] when lock
    /// acquisition fails.
    pub fn deleted(&self) -> NotificationPlatformResult<Vec<ExternalNotificationId>> {
        Ok(self
            .calls()?
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::Delete(id) => Some(id),
                _ => None,
            })
            .collect())
    }

    /// Forgets every recorded call.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationPlatformError::Unavailable`] when lock
    /// acquisition fails.
    pub fn clear_calls(&self) -> NotificationPlatformResult<()> {
        self.write()?.calls.clear();
        Ok(())
    }

    fn write(&self) -> NotificationPlatformResult<RwLockWriteGuard<'_, PlatformState>> {
        self.state.write().map_err(lock_failure)
    }

    fn record_withdrawal(&self, call: PlatformCall) -> NotificationPlatformResult<()> {
        let mut state = self.write()?;
        state.calls.push(call);
        if state.failing_withdrawals {
            return Err(injected("injected withdrawal failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationPlatform for InMemoryNotificationPlatform {
    async fn create_notification(
        &self,
        recipient: &Recipient,
        payload: &NotificationPayload,
    ) -> NotificationPlatformResult<ExternalNotificationId> {
        let mut state = self.write()?;
        if state.failing_recipients.contains(recipient) {
            state.calls.push(PlatformCall::Create {
                recipient: *recipient,
                kind: payload.kind,
                issued: None,
            });
            return Err(injected("injected delivery failure"));
        }
        state.next_id = state.next_id.saturating_add(1);
        let id = ExternalNotificationId::new(format!("ntf-{}", state.next_id));
        state.calls.push(PlatformCall::Create {
            recipient: *recipient,
            kind: payload.kind,
            issued: Some(id.clone()),
        });
        Ok(id)
    }

    async fn mark_notification_read(
        &self,
        id: &ExternalNotificationId,
    ) -> NotificationPlatformResult<()> {
        self.record_withdrawal(PlatformCall::MarkRead(id.clone()))
    }

    async fn delete_notification(
        &self,
        id: &ExternalNotificationId,
    ) -> NotificationPlatformResult<()> {
        self.record_withdrawal(PlatformCall::Delete(id.clone()))
    }
}
