//! Builds visibility predicates for actors.

use super::TaskPredicate;
use crate::directory::domain::CompanyAccess;
use crate::task::domain::{Actor, ActorRole, Task, TaskId};
use serde::{Deserialize, Serialize};

/// Which part of the task tree a listing covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingScope {
    /// Every visible task regardless of depth.
    #[default]
    All,
    /// The top-level board, with disjoint-subtask promotion.
    TopLevel,
    /// Direct children of a known task. Promotion does not apply.
    ChildrenOf(TaskId),
}

/// Options controlling predicate construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityOptions {
    /// Whether viewer grants make tasks visible.
    pub include_viewer_grants: bool,
    /// Portion of the tree to list.
    pub scope: ListingScope,
    /// Whether archived tasks are listed.
    pub include_archived: bool,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            include_viewer_grants: true,
            scope: ListingScope::All,
            include_archived: true,
        }
    }
}

impl VisibilityOptions {
    /// Options for the top-level board.
    #[must_use]
    pub fn top_level() -> Self {
        Self {
            scope: ListingScope::TopLevel,
            ..Self::default()
        }
    }

    /// Options for the direct children of a task.
    #[must_use]
    pub fn children_of(parent_id: TaskId) -> Self {
        Self {
            scope: ListingScope::ChildrenOf(parent_id),
            ..Self::default()
        }
    }

    /// Sets whether viewer grants count towards visibility.
    #[must_use]
    pub const fn with_viewer_grants(mut self, include: bool) -> Self {
        self.include_viewer_grants = include;
        self
    }

    /// Sets whether archived tasks are listed.
    #[must_use]
    pub const fn with_archived(mut self, include: bool) -> Self {
        self.include_archived = include;
        self
    }
}

/// Predicate for the tasks an actor may access, ignoring workspace, soft
/// deletion and tree position.
///
/// Returns `None` for unrestricted internal users.
#[must_use]
pub fn access_predicate(actor: &Actor, include_viewer_grants: bool) -> Option<TaskPredicate> {
    match actor.role() {
        ActorRole::InternalUser {
            company_access: CompanyAccess::Unrestricted,
            ..
        } => None,
        ActorRole::InternalUser {
            company_access: CompanyAccess::Limited(companies),
            ..
        } => {
            let mut clauses = vec![
                TaskPredicate::AssignedToInternalUser,
                TaskPredicate::Unassigned,
                TaskPredicate::AssigneeCompanyIn(companies.clone()),
            ];
            if include_viewer_grants {
                clauses.push(TaskPredicate::ViewerGrantCompanyIn(companies.clone()));
            }
            Some(TaskPredicate::Any(clauses))
        }
        ActorRole::Client {
            company_id: None, ..
        } => Some(TaskPredicate::Nothing),
        ActorRole::Client {
            client_id,
            company_id: Some(company_id),
        } => {
            let mut clauses = vec![
                TaskPredicate::AssignedToClient {
                    client_id: *client_id,
                    company_id: *company_id,
                },
                TaskPredicate::AssignedToCompany(*company_id),
            ];
            if include_viewer_grants {
                clauses.push(TaskPredicate::ViewerGrantFor {
                    client_id: *client_id,
                    company_id: *company_id,
                });
            }
            Some(TaskPredicate::Any(clauses))
        }
    }
}

/// Builds the predicate selecting the tasks `actor` may list.
///
/// Top-level listings for restricted actors surface a task when its
/// immediate parent is not itself visible. Listings of a known parent's
/// children never promote.
#[must_use]
pub fn build_predicate(actor: &Actor, options: &VisibilityOptions) -> TaskPredicate {
    let access = access_predicate(actor, options.include_viewer_grants);
    if access.as_ref().is_some_and(TaskPredicate::is_nothing) {
        return TaskPredicate::Nothing;
    }

    let mut visible =
        TaskPredicate::InWorkspace(actor.workspace_id()).and(TaskPredicate::NotDeleted);
    if !options.include_archived {
        visible = visible.and(TaskPredicate::NotArchived);
    }
    if let Some(access) = access.as_ref() {
        visible = visible.and(access.clone());
    }

    match options.scope {
        ListingScope::All => visible,
        ListingScope::ChildrenOf(parent_id) => visible.and(TaskPredicate::ChildOf(parent_id)),
        ListingScope::TopLevel if access.is_none() => visible.and(TaskPredicate::TopLevel),
        ListingScope::TopLevel => {
            let hidden_parent = visible.clone().on_parent().negated();
            visible.and(hidden_parent)
        }
    }
}

/// Returns `true` when the actor may see the task.
#[must_use]
pub fn is_visible(actor: &Actor, task: &Task, options: &VisibilityOptions) -> bool {
    let unscoped = VisibilityOptions {
        scope: ListingScope::All,
        ..*options
    };
    build_predicate(actor, &unscoped).matches(task, None)
}
