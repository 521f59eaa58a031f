//! The authenticated party performing an operation.

use super::ParseKindError;
use crate::directory::domain::{ClientId, CompanyAccess, CompanyId, InternalUserId, WorkspaceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Identity of an individual actor, as recorded in `created_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ActorId {
    /// Internal staff member.
    InternalUser(InternalUserId),
    /// External client.
    Client(ClientId),
}

impl ActorId {
    /// Storage discriminator.
    #[must_use]
    pub const fn kind_str(self) -> &'static str {
        match self {
            Self::InternalUser(_) => "internal_user",
            Self::Client(_) => "client",
        }
    }

    /// Wrapped identifier.
    #[must_use]
    pub const fn into_uuid(self) -> Uuid {
        match self {
            Self::InternalUser(id) => id.into_inner(),
            Self::Client(id) => id.into_inner(),
        }
    }

    /// Rebuilds an actor identity from its persisted parts.
    ///
    /// # Errors
    ///
    /// Returns [`ParseKindError`] for an unknown discriminator.
    pub fn from_parts(kind: &str, id: Uuid) -> Result<Self, ParseKindError> {
        match kind {
            "internal_user" => Ok(Self::InternalUser(InternalUserId::from_uuid(id))),
            "client" => Ok(Self::Client(ClientId::from_uuid(id))),
            _ => Err(ParseKindError {
                field: "actor kind",
                value: kind.to_owned(),
            }),
        }
    }
}

/// Role-specific actor data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorRole {
    /// Internal staff, optionally limited to a subset of companies.
    InternalUser {
        /// Acting staff member.
        internal_user_id: InternalUserId,
        /// Companies the staff member may see.
        company_access: CompanyAccess,
    },
    /// External client. A client without a resolvable company sees nothing.
    Client {
        /// Acting client.
        client_id: ClientId,
        /// Company the client is acting for.
        company_id: Option<CompanyId>,
    },
}

/// The authenticated party performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    workspace_id: WorkspaceId,
    role: ActorRole,
}

impl Actor {
    /// An internal user with unrestricted company access.
    #[must_use]
    pub const fn internal_user(
        workspace_id: WorkspaceId,
        internal_user_id: InternalUserId,
    ) -> Self {
        Self {
            workspace_id,
            role: ActorRole::InternalUser {
                internal_user_id,
                company_access: CompanyAccess::Unrestricted,
            },
        }
    }

    /// An internal user limited to the listed companies.
    #[must_use]
    pub fn restricted_internal_user(
        workspace_id: WorkspaceId,
        internal_user_id: InternalUserId,
        companies: impl IntoIterator<Item = CompanyId>,
    ) -> Self {
        Self {
            workspace_id,
            role: ActorRole::InternalUser {
                internal_user_id,
                company_access: CompanyAccess::Limited(
                    companies.into_iter().collect::<BTreeSet<_>>(),
                ),
            },
        }
    }

    /// A client acting for a company.
    #[must_use]
    pub const fn client(
        workspace_id: WorkspaceId,
        client_id: ClientId,
        company_id: CompanyId,
    ) -> Self {
        Self {
            workspace_id,
            role: ActorRole::Client {
                client_id,
                company_id: Some(company_id),
            },
        }
    }

    /// Builds an actor from explicit role data.
    #[must_use]
    pub const fn new(workspace_id: WorkspaceId, role: ActorRole) -> Self {
        Self { workspace_id, role }
    }

    /// Workspace the actor operates in.
    #[must_use]
    pub const fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    /// Role-specific data.
    #[must_use]
    pub const fn role(&self) -> &ActorRole {
        &self.role
    }

    /// Individual identity of the actor.
    #[must_use]
    pub const fn id(&self) -> ActorId {
        match &self.role {
            ActorRole::InternalUser {
                internal_user_id, ..
            } => ActorId::InternalUser(*internal_user_id),
            ActorRole::Client { client_id, .. } => ActorId::Client(*client_id),
        }
    }
}
