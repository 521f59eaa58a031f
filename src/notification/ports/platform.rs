//! External notification platform port.

use crate::notification::domain::{ExternalNotificationId, NotificationPayload, Recipient};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for platform calls.
pub type NotificationPlatformResult<T> = Result<T, NotificationPlatformError>;

/// Delivery API of the external notification platform.
///
/// Calls are assumed at-least-once and idempotent on the platform side.
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    /// Issues a notification and returns the platform identifier.
    async fn create_notification(
        &self,
        recipient: &Recipient,
        payload: &NotificationPayload,
    ) -> NotificationPlatformResult<ExternalNotificationId>;

    /// Marks a notification as read.
    async fn mark_notification_read(
        &self,
        id: &ExternalNotificationId,
    ) -> NotificationPlatformResult<()>;

    /// Deletes a notification.
    async fn delete_notification(&self, id: &ExternalNotificationId)
    -> NotificationPlatformResult<()>;
}

/// Errors returned by platform adapters.
#[derive(Debug, Clone, Error)]
pub enum NotificationPlatformError {
    /// The platform could not be reached.
    #[error("notification platform unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),

    /// The platform refused the request.
    #[error("notification platform rejected request: {0}")]
    Rejected(String),
}

impl NotificationPlatformError {
    /// Wraps a transport failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }

    /// Returns `true` for failures that may succeed later.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
