//! Directory records for internal users, clients, and companies.

use super::{ClientId, CompanyId, InternalUserId, WorkspaceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identity kinds known to the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    /// Internal staff member.
    InternalUser,
    /// External client.
    Client,
    /// External company.
    Company,
}

impl IdentityKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InternalUser => "internal_user",
            Self::Client => "client",
            Self::Company => "company",
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Company visibility granted to an internal user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "companies", rename_all = "snake_case")]
pub enum CompanyAccess {
    /// Sees every company in the workspace.
    #[default]
    Unrestricted,
    /// Sees only the listed companies.
    Limited(BTreeSet<CompanyId>),
}

impl CompanyAccess {
    /// Creates a limited access list.
    #[must_use]
    pub fn limited(companies: impl IntoIterator<Item = CompanyId>) -> Self {
        Self::Limited(companies.into_iter().collect())
    }

    /// Returns `true` when the company is visible under this access list.
    #[must_use]
    pub fn covers(&self, company_id: CompanyId) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Limited(companies) => companies.contains(&company_id),
        }
    }

    /// Returns `true` when no access list applies.
    #[must_use]
    pub const fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }
}

/// Internal staff member as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalUser {
    /// Directory identifier.
    pub id: InternalUserId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Companies the user may see.
    pub company_access: CompanyAccess,
}

/// External client as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Directory identifier.
    pub id: ClientId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Companies the client belongs to.
    pub company_ids: BTreeSet<CompanyId>,
}

impl Client {
    /// Returns `true` when the client is a member of the company.
    #[must_use]
    pub fn is_member_of(&self, company_id: CompanyId) -> bool {
        self.company_ids.contains(&company_id)
    }
}

/// External company as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Directory identifier.
    pub id: CompanyId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
}

/// Filter applied to directory list operations.
///
/// `company_id` narrows each listing differently: internal users whose
/// access list covers the company, clients who are members of it, or the
/// company itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryFilter {
    /// Workspace to list.
    pub workspace_id: WorkspaceId,
    /// Optional company narrowing.
    pub company_id: Option<CompanyId>,
}

impl DirectoryFilter {
    /// Lists everything in the workspace.
    #[must_use]
    pub const fn workspace(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            company_id: None,
        }
    }

    /// Narrows the listing to one company.
    #[must_use]
    pub const fn company(workspace_id: WorkspaceId, company_id: CompanyId) -> Self {
        Self {
            workspace_id,
            company_id: Some(company_id),
        }
    }
}
