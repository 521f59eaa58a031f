//! Notification services.

mod fanout;
mod ledger;
mod plan;
mod reconciler;

pub use ledger::{NotificationLedger, RetireOutcome};
pub use plan::{
    Audience, NotifyStep, ReconcilePlan, ReconcileStep, plan_created, plan_deleted, plan_updated,
};
pub use reconciler::{NotificationReconciler, ReconcileReport};
