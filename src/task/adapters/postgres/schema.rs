//! Diesel schema for task, workflow state, and ledger persistence.

diesel::table! {
    /// Task records with materialized ancestry paths.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning workspace.
        workspace_id -> Uuid,
        /// Immediate parent, denormalized from `path`.
        parent_id -> Nullable<Uuid>,
        /// Task title.
        title -> Text,
        /// Assigned internal user.
        assignee_internal_user_id -> Nullable<Uuid>,
        /// Assigned client.
        assignee_client_id -> Nullable<Uuid>,
        /// Assigned company, alone or backing `assignee_client_id`.
        assignee_company_id -> Nullable<Uuid>,
        /// Viewer grants as a JSON array.
        viewers -> Jsonb,
        /// Dot-separated ancestry path, self included.
        path -> Text,
        /// Current workflow state.
        workflow_state_id -> Uuid,
        /// Archive flag.
        is_archived -> Bool,
        /// Number of live subtasks.
        subtask_count -> Int4,
        /// Creator discriminator.
        #[max_length = 32]
        created_by_kind -> Varchar,
        /// Creator identifier.
        created_by_id -> Uuid,
        /// Soft-delete marker.
        deleted_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Mutation counter guarding concurrent writes.
        revision -> Int8,
    }
}

diesel::table! {
    /// Workspace workflow states.
    workflow_states (id) {
        /// State identifier.
        id -> Uuid,
        /// Owning workspace.
        workspace_id -> Uuid,
        /// Display name.
        name -> Text,
        /// Workflow category.
        #[max_length = 32]
        state_type -> Varchar,
    }
}

diesel::table! {
    /// Outstanding external notifications, one per (recipient, task).
    notification_ledger (id) {
        /// Row identifier.
        id -> Uuid,
        /// Recipient discriminator.
        #[max_length = 32]
        recipient_kind -> Varchar,
        /// Recipient identifier.
        recipient_id -> Uuid,
        /// Company context for client recipients.
        company_id -> Nullable<Uuid>,
        /// Task the notification concerns.
        task_id -> Uuid,
        /// Platform-issued identifier.
        external_id -> Text,
        /// Notification kind.
        #[max_length = 32]
        kind -> Varchar,
        /// Time the entry was recorded.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(notification_ledger -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, workflow_states, notification_ledger);
