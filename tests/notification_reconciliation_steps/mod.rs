//! Step definitions for notification reconciliation scenarios.

mod given;
pub mod world;
