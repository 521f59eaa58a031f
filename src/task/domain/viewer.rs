//! Viewer grants sharing a task beyond its assignee.

use crate::directory::domain::{ClientId, CompanyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Grants a client, or every client of a company, read access to a task.
///
/// A grant without `client_id` covers the whole company. The serialized form
/// always carries `client_id` (as `null` when absent) so stores can match
/// grants by JSON containment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ViewerGrant {
    client_id: Option<ClientId>,
    company_id: CompanyId,
}

impl ViewerGrant {
    /// Shares the task with every client of a company.
    #[must_use]
    pub const fn company(company_id: CompanyId) -> Self {
        Self {
            client_id: None,
            company_id,
        }
    }

    /// Shares the task with one client acting for a company.
    #[must_use]
    pub const fn client(client_id: ClientId, company_id: CompanyId) -> Self {
        Self {
            client_id: Some(client_id),
            company_id,
        }
    }

    /// Client named by the grant, if it is client-specific.
    #[must_use]
    pub const fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    /// Company named by the grant.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns `true` when the grant covers the client acting for a company.
    #[must_use]
    pub fn covers_client(&self, client_id: ClientId, company_id: CompanyId) -> bool {
        self.company_id == company_id && self.client_id.is_none_or(|id| id == client_id)
    }

    /// Returns `true` when the grant names any of the companies.
    #[must_use]
    pub fn names_company_in(&self, companies: &BTreeSet<CompanyId>) -> bool {
        companies.contains(&self.company_id)
    }
}
