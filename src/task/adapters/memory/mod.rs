//! In-memory storage adapter.

mod store;

pub use store::InMemoryTaskStore;
