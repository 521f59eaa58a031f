//! Storage adapters for tasks, workflow states, and the notification ledger.
//!
//! - [`memory::InMemoryTaskStore`]: thread-safe in-memory storage for tests
//!   and local wiring
//! - [`postgres::PostgresTaskStore`]: `PostgreSQL` persistence using Diesel
//!
//! Each adapter implements every port bundled by
//! [`TaskStore`](crate::task::ports::TaskStore) over one backend so a task
//! write batch commits atomically.

pub mod memory;
pub mod postgres;
