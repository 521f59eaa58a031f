//! Taskshare: task visibility and notification consistency engine.
//!
//! This crate decides which tasks an actor may see in a multi-tenant task
//! tree, maintains the materialized ancestry of every task, and keeps a
//! local ledger of outstanding notifications consistent with task
//! assignment, workflow, archive, and delete mutations.
//!
//! # Architecture
//!
//! Taskshare follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, APIs, etc.)
//!
//! # Modules
//!
//! - [`directory`]: Identity directory port and retry helpers
//! - [`task`]: Task aggregate, paths, assignment, and the lifecycle service
//! - [`visibility`]: Per-actor visibility predicates
//! - [`notification`]: Notification ledger and reconciliation
//! - [`config`]: Engine configuration

pub mod config;
pub mod directory;
mod ids;
pub mod notification;
pub mod task;
pub mod visibility;
