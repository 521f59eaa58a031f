//! Diesel row models for task storage.

use super::schema::{notification_ledger, tasks, workflow_states};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable, Insertable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning workspace.
    pub workspace_id: uuid::Uuid,
    /// Immediate parent.
    pub parent_id: Option<uuid::Uuid>,
    /// Task title.
    pub title: String,
    /// Assigned internal user.
    pub assignee_internal_user_id: Option<uuid::Uuid>,
    /// Assigned client.
    pub assignee_client_id: Option<uuid::Uuid>,
    /// Assigned company.
    pub assignee_company_id: Option<uuid::Uuid>,
    /// Viewer grants.
    pub viewers: Value,
    /// Encoded ancestry path.
    pub path: String,
    /// Current workflow state.
    pub workflow_state_id: uuid::Uuid,
    /// Archive flag.
    pub is_archived: bool,
    /// Number of live subtasks.
    pub subtask_count: i32,
    /// Creator discriminator.
    pub created_by_kind: String,
    /// Creator identifier.
    pub created_by_id: uuid::Uuid,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Mutation counter.
    pub revision: i64,
}

/// Mutable task columns. Identity, path, and counters are never updated
/// through this changeset.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskChangeset {
    /// Task title.
    pub title: String,
    /// Assigned internal user.
    pub assignee_internal_user_id: Option<uuid::Uuid>,
    /// Assigned client.
    pub assignee_client_id: Option<uuid::Uuid>,
    /// Assigned company.
    pub assignee_company_id: Option<uuid::Uuid>,
    /// Viewer grants.
    pub viewers: Value,
    /// Current workflow state.
    pub workflow_state_id: uuid::Uuid,
    /// Archive flag.
    pub is_archived: bool,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Mutation counter.
    pub revision: i64,
}

/// Row for workflow state records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = workflow_states)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkflowStateRow {
    /// State identifier.
    pub id: uuid::Uuid,
    /// Owning workspace.
    pub workspace_id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Workflow category.
    pub state_type: String,
}

/// Row for ledger records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = notification_ledger)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LedgerRow {
    /// Row identifier.
    pub id: uuid::Uuid,
    /// Recipient discriminator.
    pub recipient_kind: String,
    /// Recipient identifier.
    pub recipient_id: uuid::Uuid,
    /// Company context for client recipients.
    pub company_id: Option<uuid::Uuid>,
    /// Task the notification concerns.
    pub task_id: uuid::Uuid,
    /// Platform-issued identifier.
    pub external_id: String,
    /// Notification kind.
    pub kind: String,
    /// Time the entry was recorded.
    pub created_at: DateTime<Utc>,
}
