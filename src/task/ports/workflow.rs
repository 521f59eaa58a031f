//! Read-only port for workspace workflow states.

use super::TaskRepositoryResult;
use crate::directory::domain::WorkspaceId;
use crate::task::domain::{WorkflowState, WorkflowStateId};
use async_trait::async_trait;

/// Workflow state lookup contract.
#[async_trait]
pub trait WorkflowStateRepository: Send + Sync {
    /// Finds a workflow state by identifier.
    async fn find_workflow_state(
        &self,
        id: WorkflowStateId,
    ) -> TaskRepositoryResult<Option<WorkflowState>>;

    /// Lists the workflow states configured for a workspace.
    async fn list_workflow_states(
        &self,
        workspace_id: WorkspaceId,
    ) -> TaskRepositoryResult<Vec<WorkflowState>>;
}
