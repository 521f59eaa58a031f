//! Port contracts for the identity directory.

pub mod directory;

pub use directory::{DirectoryError, DirectoryResult, IdentityDirectory};
