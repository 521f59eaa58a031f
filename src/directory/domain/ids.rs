//! Identifier types for directory identities.

use crate::ids::uuid_identifier;

uuid_identifier! {
    /// Tenant boundary owning tasks, workflow states, and identities.
    WorkspaceId
}

uuid_identifier! {
    /// Internal staff member identifier.
    InternalUserId
}

uuid_identifier! {
    /// External client identifier.
    ClientId
}

uuid_identifier! {
    /// External company (group of clients) identifier.
    CompanyId
}
