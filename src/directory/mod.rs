//! Identity directory integration.
//!
//! The directory is an external collaborator that owns internal users,
//! clients, and companies. This module models the identities the engine
//! needs, the port it calls, an in-memory adapter, and the retry helper used
//! for transient directory failures:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Call helpers in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
