//! Tasks, their hierarchy, and the lifecycle operations that drive
//! notification reconciliation.
//!
//! A task belongs to one workspace, optionally has a single assignee, and
//! may nest under a parent up to the configured depth. Every committed
//! mutation is paired with a reconciliation plan so the notification ledger
//! and the external platform follow the task's visibility. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
