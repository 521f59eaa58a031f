//! Notification bookkeeping and reconciliation.
//!
//! The ledger records which external notifications are still outstanding for
//! each (recipient, task) pair so that later task mutations can retire them
//! instead of piling up duplicates. The reconciler turns task lifecycle
//! events into ordered ledger and platform side effects:
//!
//! - Domain types in [`domain`]
//! - Ledger and platform ports in [`ports`]
//! - In-memory platform adapter in [`adapters`]
//! - Ledger and reconciler services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
