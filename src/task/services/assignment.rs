//! Resolves raw assignee fields and viewer grants against the directory.

use super::{TaskServiceError, TaskServiceResult};
use crate::config::RetryPolicy;
use crate::directory::{
    domain::{ClientId, CompanyId, DirectoryFilter, WorkspaceId},
    ports::{DirectoryError, IdentityDirectory},
    services::with_retry,
};
use crate::task::domain::{Assignee, AssigneeFields, ViewerGrant};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Turns the three optional assignee fields into one validated [`Assignee`].
#[derive(Clone)]
pub struct AssignmentResolver<D>
where
    D: IdentityDirectory,
{
    directory: Arc<D>,
    retry: RetryPolicy,
}

fn directory_failure(err: DirectoryError) -> TaskServiceError {
    match err {
        DirectoryError::NotFound { .. } => TaskServiceError::InvalidAssignee(err.to_string()),
        DirectoryError::Transient(_) => TaskServiceError::TransientDependencyFailure(err),
    }
}

impl<D> AssignmentResolver<D>
where
    D: IdentityDirectory,
{
    /// Creates a resolver retrying transient directory failures under
    /// `retry`.
    #[must_use]
    pub const fn new(directory: Arc<D>, retry: RetryPolicy) -> Self {
        Self { directory, retry }
    }

    /// Resolves the assignee fields of a create or update request.
    ///
    /// `None` in every field resolves to an unassigned task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::InvalidAssignee`] for an ambiguous shape,
    /// an unknown identity, or a client that is not a member of the supplied
    /// company, and [`TaskServiceError::TransientDependencyFailure`] when the
    /// directory stays unavailable.
    pub async fn resolve(
        &self,
        workspace_id: WorkspaceId,
        fields: AssigneeFields,
    ) -> TaskServiceResult<Option<Assignee>> {
        let assignee = fields
            .into_assignee()
            .map_err(|err| TaskServiceError::InvalidAssignee(err.to_string()))?;
        match assignee {
            None => {}
            Some(Assignee::InternalUser { internal_user_id }) => {
                let filter = DirectoryFilter::workspace(workspace_id);
                let roster = with_retry(&self.retry, "list_internal_users", || {
                    self.directory.list_internal_users(&filter)
                })
                .await
                .map_err(directory_failure)?;
                if !roster.iter().any(|user| user.id == internal_user_id) {
                    return Err(TaskServiceError::InvalidAssignee(format!(
                        "internal user {internal_user_id} is not on the workspace roster"
                    )));
                }
            }
            Some(Assignee::Client {
                client_id,
                company_id,
            }) => self.check_membership(workspace_id, client_id, company_id).await?,
            Some(Assignee::Company { company_id }) => {
                let companies = self.company_roster(workspace_id).await?;
                if !companies.contains(&company_id) {
                    return Err(unknown_company(company_id));
                }
            }
        }
        Ok(assignee)
    }

    /// Validates a replacement set of viewer grants.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::InvalidAssignee`] when a grant names an
    /// unknown company or a client outside the named company, and
    /// [`TaskServiceError::TransientDependencyFailure`] when the directory
    /// stays unavailable.
    pub async fn resolve_viewers(
        &self,
        workspace_id: WorkspaceId,
        viewers: Vec<ViewerGrant>,
    ) -> TaskServiceResult<Vec<ViewerGrant>> {
        if viewers.is_empty() {
            return Ok(viewers);
        }
        let companies = self.company_roster(workspace_id).await?;
        for grant in &viewers {
            if !companies.contains(&grant.company_id()) {
                return Err(unknown_company(grant.company_id()));
            }
            if let Some(client_id) = grant.client_id() {
                self.check_membership(workspace_id, client_id, grant.company_id())
                    .await?;
            }
        }
        Ok(viewers)
    }

    async fn check_membership(
        &self,
        workspace_id: WorkspaceId,
        client_id: ClientId,
        company_id: CompanyId,
    ) -> TaskServiceResult<()> {
        let client = with_retry(&self.retry, "get_client", || {
            self.directory.get_client(workspace_id, client_id)
        })
        .await
        .map_err(directory_failure)?;
        if client.is_member_of(company_id) {
            Ok(())
        } else {
            Err(TaskServiceError::InvalidAssignee(format!(
                "client {client_id} is not a member of company {company_id}"
            )))
        }
    }

    async fn company_roster(
        &self,
        workspace_id: WorkspaceId,
    ) -> TaskServiceResult<BTreeSet<CompanyId>> {
        let filter = DirectoryFilter::workspace(workspace_id);
        let companies = with_retry(&self.retry, "list_companies", || {
            self.directory.list_companies(&filter)
        })
        .await
        .map_err(directory_failure)?;
        Ok(companies.into_iter().map(|company| company.id).collect())
    }
}

fn unknown_company(company_id: CompanyId) -> TaskServiceError {
    TaskServiceError::InvalidAssignee(format!(
        "company {company_id} is not on the workspace roster"
    ))
}
