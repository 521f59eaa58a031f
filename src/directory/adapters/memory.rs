//! In-memory identity directory for tests and local wiring.

use crate::directory::{
    domain::{
        Client, ClientId, Company, CompanyAccess, CompanyId, DirectoryFilter, IdentityKind,
        InternalUser, InternalUserId, WorkspaceId,
    },
    ports::{DirectoryError, DirectoryResult, IdentityDirectory},
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory identity directory.
///
/// Supports injecting a number of transient failures so callers' retry
/// behaviour can be exercised deterministically.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    internal_users: BTreeMap<InternalUserId, InternalUser>,
    clients: BTreeMap<ClientId, Client>,
    companies: BTreeMap<CompanyId, Company>,
    pending_failures: usize,
    calls: usize,
}

impl InMemoryIdentityDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an internal user.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Transient`] when lock acquisition fails.
    pub fn add_internal_user(
        &self,
        workspace_id: WorkspaceId,
        company_access: CompanyAccess,
    ) -> DirectoryResult<InternalUserId> {
        let id = InternalUserId::new();
        self.write()?.internal_users.insert(
            id,
            InternalUser {
                id,
                workspace_id,
                company_access,
            },
        );
        Ok(id)
    }

    /// Registers a company.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Transient`] when lock acquisition fails.
    pub fn add_company(&self, workspace_id: WorkspaceId) -> DirectoryResult<CompanyId> {
        let id = CompanyId::new();
        self.write()?
            .companies
            .insert(id, Company { id, workspace_id });
        Ok(id)
    }

    /// Registers a client belonging to the given companies.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Transient`] when lock acquisition fails.
    pub fn add_client(
        &self,
        workspace_id: WorkspaceId,
        company_ids: impl IntoIterator<Item = CompanyId>,
    ) -> DirectoryResult<ClientId> {
        let id = ClientId::new();
        self.write()?.clients.insert(
            id,
            Client {
                id,
                workspace_id,
                company_ids: company_ids.into_iter().collect::<BTreeSet<_>>(),
            },
        );
        Ok(id)
    }

    /// Makes the next `count` directory calls fail with a transient error.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Transient`] when lock acquisition fails.
    pub fn fail_next_calls(&self, count: usize) -> DirectoryResult<()> {
        self.write()?.pending_failures = count;
        Ok(())
    }

    /// Returns the number of directory calls observed so far.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Transient`] when lock acquisition fails.
    pub fn call_count(&self) -> DirectoryResult<usize> {
        let state = self
            .state
            .read()
            .map_err(|err| DirectoryError::transient(std::io::Error::other(err.to_string())))?;
        Ok(state.calls)
    }

    fn write(&self) -> DirectoryResult<std::sync::RwLockWriteGuard<'_, DirectoryState>> {
        self.state
            .write()
            .map_err(|err| DirectoryError::transient(std::io::Error::other(err.to_string())))
    }

    /// Records a call and consumes one injected failure, if any remain.
    fn begin_call(&self) -> DirectoryResult<std::sync::RwLockWriteGuard<'_, DirectoryState>> {
        let mut state = self.write()?;
        state.calls = state.calls.saturating_add(1);
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(DirectoryError::transient(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "injected directory failure",
            )));
        }
        Ok(state)
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn get_internal_user(
        &self,
        workspace_id: WorkspaceId,
        id: InternalUserId,
    ) -> DirectoryResult<InternalUser> {
        let state = self.begin_call()?;
        state
            .internal_users
            .get(&id)
            .filter(|user| user.workspace_id == workspace_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(IdentityKind::InternalUser, id))
    }

    async fn get_client(&self, workspace_id: WorkspaceId, id: ClientId) -> DirectoryResult<Client> {
        let state = self.begin_call()?;
        state
            .clients
            .get(&id)
            .filter(|client| client.workspace_id == workspace_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(IdentityKind::Client, id))
    }

    async fn get_company(
        &self,
        workspace_id: WorkspaceId,
        id: CompanyId,
    ) -> DirectoryResult<Company> {
        let state = self.begin_call()?;
        state
            .companies
            .get(&id)
            .filter(|company| company.workspace_id == workspace_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(IdentityKind::Company, id))
    }

    async fn list_internal_users(
        &self,
        filter: &DirectoryFilter,
    ) -> DirectoryResult<Vec<InternalUser>> {
        let state = self.begin_call()?;
        Ok(state
            .internal_users
            .values()
            .filter(|user| user.workspace_id == filter.workspace_id)
            .filter(|user| {
                filter
                    .company_id
                    .is_none_or(|company_id| user.company_access.covers(company_id))
            })
            .cloned()
            .collect())
    }

    async fn list_clients(&self, filter: &DirectoryFilter) -> DirectoryResult<Vec<Client>> {
        let state = self.begin_call()?;
        Ok(state
            .clients
            .values()
            .filter(|client| client.workspace_id == filter.workspace_id)
            .filter(|client| {
                filter
                    .company_id
                    .is_none_or(|company_id| client.is_member_of(company_id))
            })
            .cloned()
            .collect())
    }

    async fn list_companies(&self, filter: &DirectoryFilter) -> DirectoryResult<Vec<Company>> {
        let state = self.begin_call()?;
        Ok(state
            .companies
            .values()
            .filter(|company| company.workspace_id == filter.workspace_id)
            .filter(|company| filter.company_id.is_none_or(|id| company.id == id))
            .cloned()
            .collect())
    }
}
