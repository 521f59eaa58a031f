//! Port contracts for notification bookkeeping and delivery.

pub mod ledger;
pub mod platform;

pub use ledger::{NotificationLedgerError, NotificationLedgerRepository, NotificationLedgerResult};
pub use platform::{NotificationPlatform, NotificationPlatformError, NotificationPlatformResult};
