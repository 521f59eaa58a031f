//! `PostgreSQL` adapters for task, workflow state, and ledger persistence.
//!
//! Visibility predicates are compiled to SQL so listings are filtered in the
//! database. Writes are applied in one transaction per batch.

mod models;
mod predicate_sql;
mod repository;
mod schema;

pub use repository::{PostgresTaskStore, TaskPgPool};
