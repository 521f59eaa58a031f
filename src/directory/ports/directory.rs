//! Identity directory port.

use crate::directory::domain::{
    Client, ClientId, Company, CompanyId, DirectoryFilter, IdentityKind, InternalUser,
    InternalUserId, WorkspaceId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result type for identity directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Read access to the workspace identity directory.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Fetches one internal user.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotFound`] when the user does not exist in
    /// the workspace, or [`DirectoryError::Transient`] when the directory is
    /// unreachable.
    async fn get_internal_user(
        &self,
        workspace_id: WorkspaceId,
        id: InternalUserId,
    ) -> DirectoryResult<InternalUser>;

    /// Fetches one client.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotFound`] or [`DirectoryError::Transient`].
    async fn get_client(&self, workspace_id: WorkspaceId, id: ClientId) -> DirectoryResult<Client>;

    /// Fetches one company.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotFound`] or [`DirectoryError::Transient`].
    async fn get_company(
        &self,
        workspace_id: WorkspaceId,
        id: CompanyId,
    ) -> DirectoryResult<Company>;

    /// Lists internal users matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Transient`] when the directory is
    /// unreachable.
    async fn list_internal_users(
        &self,
        filter: &DirectoryFilter,
    ) -> DirectoryResult<Vec<InternalUser>>;

    /// Lists clients matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Transient`] when the directory is
    /// unreachable.
    async fn list_clients(&self, filter: &DirectoryFilter) -> DirectoryResult<Vec<Client>>;

    /// Lists companies matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Transient`] when the directory is
    /// unreachable.
    async fn list_companies(&self, filter: &DirectoryFilter) -> DirectoryResult<Vec<Company>>;
}

/// Errors returned by identity directory adapters.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// The identity does not exist. Terminal.
    #[error("{kind} {id} not found in directory")]
    NotFound {
        /// Identity kind that was looked up.
        kind: IdentityKind,
        /// Identifier that was looked up.
        id: Uuid,
    },

    /// The directory could not be reached. Callers retry with backoff.
    #[error("identity directory unavailable: {0}")]
    Transient(Arc<dyn std::error::Error + Send + Sync>),
}

impl DirectoryError {
    /// Wraps a transport or availability failure.
    pub fn transient(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transient(Arc::new(err))
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(kind: IdentityKind, id: impl AsRef<Uuid>) -> Self {
        Self::NotFound {
            kind,
            id: *id.as_ref(),
        }
    }

    /// Returns `true` for failures worth retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
