//! Helpers for calling the identity directory.

mod retry;

pub use retry::with_retry;
