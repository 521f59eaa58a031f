//! Identity types owned by the external directory.

mod identity;
mod ids;

pub use identity::{Client, Company, CompanyAccess, DirectoryFilter, IdentityKind, InternalUser};
pub use ids::{ClientId, CompanyId, InternalUserId, WorkspaceId};
