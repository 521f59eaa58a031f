//! Boolean predicates over task rows.

use crate::directory::domain::{ClientId, CompanyId, WorkspaceId};
use crate::task::domain::{Assignee, Task, TaskId};
use std::collections::BTreeSet;

/// Predicate over a task and, for [`TaskPredicate::Parent`], its immediate
/// parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPredicate {
    /// Matches no task.
    Nothing,
    /// Task belongs to the workspace.
    InWorkspace(WorkspaceId),
    /// Task is not soft-deleted.
    NotDeleted,
    /// Task is not archived.
    NotArchived,
    /// Task has no parent.
    TopLevel,
    /// Task is a direct child of the given task.
    ChildOf(TaskId),
    /// Task is assigned to some internal user.
    AssignedToInternalUser,
    /// Task has no assignee.
    Unassigned,
    /// Task is assigned to this client acting for this company.
    AssignedToClient {
        /// Assigned client.
        client_id: ClientId,
        /// Company the client acts for.
        company_id: CompanyId,
    },
    /// Task is assigned to the company as a whole, with no specific client.
    AssignedToCompany(CompanyId),
    /// Task is assigned to a client or company whose company is listed.
    AssigneeCompanyIn(BTreeSet<CompanyId>),
    /// A viewer grant names this client and company, or the company alone.
    ViewerGrantFor {
        /// Client to match.
        client_id: ClientId,
        /// Company to match.
        company_id: CompanyId,
    },
    /// A viewer grant names any of the listed companies.
    ViewerGrantCompanyIn(BTreeSet<CompanyId>),
    /// The task has a parent and the parent matches the inner predicate.
    ///
    /// Nested `Parent` predicates inside the inner predicate never match.
    Parent(Box<TaskPredicate>),
    /// Negation.
    Not(Box<TaskPredicate>),
    /// Conjunction. Empty matches everything.
    All(Vec<TaskPredicate>),
    /// Disjunction. Empty matches nothing.
    Any(Vec<TaskPredicate>),
}

impl TaskPredicate {
    /// Conjunction with another predicate, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::All(mut left), Self::All(right)) => {
                left.extend(right);
                Self::All(left)
            }
            (Self::All(mut left), right) => {
                left.push(right);
                Self::All(left)
            }
            (left, Self::All(mut right)) => {
                right.insert(0, left);
                Self::All(right)
            }
            (left, right) => Self::All(vec![left, right]),
        }
    }

    /// Disjunction with another predicate.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::Any(mut left), right) => {
                left.push(right);
                Self::Any(left)
            }
            (left, right) => Self::Any(vec![left, right]),
        }
    }

    /// Negation.
    #[must_use]
    pub fn negated(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Wraps the predicate so it is evaluated against the parent.
    #[must_use]
    pub fn on_parent(self) -> Self {
        Self::Parent(Box::new(self))
    }

    /// Returns `true` when the predicate can never match.
    #[must_use]
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// Evaluates the predicate against a task and its immediate parent.
    ///
    /// `parent` is ignored unless the predicate contains
    /// [`TaskPredicate::Parent`]; callers that know the predicate has no
    /// parent clause may pass `None`.
    #[must_use]
    pub fn matches(&self, task: &Task, parent: Option<&Task>) -> bool {
        match self {
            Self::Nothing => false,
            Self::InWorkspace(workspace_id) => task.workspace_id() == *workspace_id,
            Self::NotDeleted => !task.is_deleted(),
            Self::NotArchived => !task.is_archived(),
            Self::TopLevel => task.parent_id().is_none(),
            Self::ChildOf(parent_id) => task.parent_id() == Some(*parent_id),
            Self::AssignedToInternalUser => {
                matches!(task.assignee(), Some(Assignee::InternalUser { .. }))
            }
            Self::Unassigned => task.assignee().is_none(),
            Self::AssignedToClient {
                client_id,
                company_id,
            } => {
                task.assignee() == Some(&Assignee::client(*client_id, *company_id))
            }
            Self::AssignedToCompany(company_id) => {
                task.assignee() == Some(&Assignee::company(*company_id))
            }
            Self::AssigneeCompanyIn(companies) => task
                .assignee()
                .and_then(Assignee::company_id)
                .is_some_and(|company_id| companies.contains(&company_id)),
            Self::ViewerGrantFor {
                client_id,
                company_id,
            } => task
                .viewers()
                .iter()
                .any(|grant| grant.covers_client(*client_id, *company_id)),
            Self::ViewerGrantCompanyIn(companies) => task
                .viewers()
                .iter()
                .any(|grant| grant.names_company_in(companies)),
            Self::Parent(inner) => parent.is_some_and(|parent_task| {
                task.parent_id() == Some(parent_task.id()) && inner.matches(parent_task, None)
            }),
            Self::Not(inner) => !inner.matches(task, parent),
            Self::All(predicates) => predicates.iter().all(|p| p.matches(task, parent)),
            Self::Any(predicates) => predicates.iter().any(|p| p.matches(task, parent)),
        }
    }
}
