//! Notification domain types.

mod entry;
mod event;
mod ids;
mod payload;
mod recipient;
mod scope;

pub use entry::{LedgerEntry, NotificationKind};
pub use event::{TaskLifecycleEvent, TaskSnapshot};
pub use ids::{ExternalNotificationId, LedgerEntryId};
pub use payload::NotificationPayload;
pub use recipient::{Recipient, RecipientKind};
pub use scope::{RetireMode, RetireScope};
