//! Task assignees.
//!
//! Requests and persistence carry three nullable identity columns. They are
//! folded into the [`Assignee`] sum type exactly once so the rest of the
//! engine never re-inspects the raw shape.

use super::{ActorId, ParseKindError, TaskDomainError};
use crate::directory::domain::{ClientId, CompanyId, InternalUserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The party a task is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assignee {
    /// An internal staff member.
    InternalUser {
        /// Assigned staff member.
        internal_user_id: InternalUserId,
    },
    /// A specific client acting for one of their companies.
    Client {
        /// Assigned client.
        client_id: ClientId,
        /// Company the client acts for on this task.
        company_id: CompanyId,
    },
    /// A company as a whole; every member is notified.
    Company {
        /// Assigned company.
        company_id: CompanyId,
    },
}

impl Assignee {
    /// Assigns an internal user.
    #[must_use]
    pub const fn internal_user(internal_user_id: InternalUserId) -> Self {
        Self::InternalUser { internal_user_id }
    }

    /// Assigns a client acting for a company.
    #[must_use]
    pub const fn client(client_id: ClientId, company_id: CompanyId) -> Self {
        Self::Client {
            client_id,
            company_id,
        }
    }

    /// Assigns a whole company.
    #[must_use]
    pub const fn company(company_id: CompanyId) -> Self {
        Self::Company { company_id }
    }

    /// Canonical assignee type.
    #[must_use]
    pub const fn assignee_type(&self) -> AssigneeType {
        match self {
            Self::InternalUser { .. } => AssigneeType::InternalUser,
            Self::Client { .. } => AssigneeType::Client,
            Self::Company { .. } => AssigneeType::Company,
        }
    }

    /// Canonical assignee identifier.
    #[must_use]
    pub const fn assignee_id(&self) -> Uuid {
        match self {
            Self::InternalUser { internal_user_id } => internal_user_id.into_inner(),
            Self::Client { client_id, .. } => client_id.into_inner(),
            Self::Company { company_id } => company_id.into_inner(),
        }
    }

    /// Company backing a client or company assignment.
    #[must_use]
    pub const fn company_id(&self) -> Option<CompanyId> {
        match self {
            Self::InternalUser { .. } => None,
            Self::Client { company_id, .. } | Self::Company { company_id } => Some(*company_id),
        }
    }

    /// Returns `true` when the assignee is the given acting identity.
    ///
    /// A company never equals an individual actor.
    #[must_use]
    pub fn is_identity(&self, actor: ActorId) -> bool {
        match (self, actor) {
            (Self::InternalUser { internal_user_id }, ActorId::InternalUser(id)) => {
                *internal_user_id == id
            }
            (Self::Client { client_id, .. }, ActorId::Client(id)) => *client_id == id,
            _ => false,
        }
    }
}

/// Kind discriminator stored alongside the assignee identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeType {
    /// Internal staff member.
    InternalUser,
    /// Client with company.
    Client,
    /// Company alone.
    Company,
    /// Unassigned.
    None,
}

impl AssigneeType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InternalUser => "internal_user",
            Self::Client => "client",
            Self::Company => "company",
            Self::None => "none",
        }
    }

    /// Type of an optional assignee.
    #[must_use]
    pub const fn of(assignee: Option<&Assignee>) -> Self {
        match assignee {
            Some(assignee) => assignee.assignee_type(),
            None => Self::None,
        }
    }
}

impl TryFrom<&str> for AssigneeType {
    type Error = ParseKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "internal_user" => Ok(Self::InternalUser),
            "client" => Ok(Self::Client),
            "company" => Ok(Self::Company),
            "none" => Ok(Self::None),
            _ => Err(ParseKindError {
                field: "assignee type",
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for AssigneeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw, mutually exclusive assignee identity fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssigneeFields {
    /// Internal user identifier.
    pub internal_user_id: Option<InternalUserId>,
    /// Client identifier; requires `company_id`.
    pub client_id: Option<ClientId>,
    /// Company identifier, alone or alongside `client_id`.
    pub company_id: Option<CompanyId>,
}

impl AssigneeFields {
    /// No assignee.
    #[must_use]
    pub const fn unassigned() -> Self {
        Self {
            internal_user_id: None,
            client_id: None,
            company_id: None,
        }
    }

    /// Fields for an internal user.
    #[must_use]
    pub const fn internal_user(id: InternalUserId) -> Self {
        Self {
            internal_user_id: Some(id),
            client_id: None,
            company_id: None,
        }
    }

    /// Fields for a client acting for a company.
    #[must_use]
    pub const fn client(client_id: ClientId, company_id: CompanyId) -> Self {
        Self {
            internal_user_id: None,
            client_id: Some(client_id),
            company_id: Some(company_id),
        }
    }

    /// Fields for a whole company.
    #[must_use]
    pub const fn company(company_id: CompanyId) -> Self {
        Self {
            internal_user_id: None,
            client_id: None,
            company_id: Some(company_id),
        }
    }

    /// Splits an assignee back into its persisted columns.
    #[must_use]
    pub const fn from_assignee(assignee: Option<&Assignee>) -> Self {
        match assignee {
            None => Self::unassigned(),
            Some(Assignee::InternalUser { internal_user_id }) => {
                Self::internal_user(*internal_user_id)
            }
            Some(Assignee::Client {
                client_id,
                company_id,
            }) => Self::client(*client_id, *company_id),
            Some(Assignee::Company { company_id }) => Self::company(*company_id),
        }
    }

    /// Folds the fields into an assignee without consulting the directory.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AmbiguousAssignee`] when an internal user
    /// is combined with client or company fields, and
    /// [`TaskDomainError::ClientWithoutCompany`] for a bare client.
    pub const fn into_assignee(self) -> Result<Option<Assignee>, TaskDomainError> {
        match (self.internal_user_id, self.client_id, self.company_id) {
            (None, None, None) => Ok(None),
            (Some(internal_user_id), None, None) => {
                Ok(Some(Assignee::InternalUser { internal_user_id }))
            }
            (None, Some(client_id), Some(company_id)) => Ok(Some(Assignee::Client {
                client_id,
                company_id,
            })),
            (None, None, Some(company_id)) => Ok(Some(Assignee::Company { company_id })),
            (None, Some(_), None) => Err(TaskDomainError::ClientWithoutCompany),
            (Some(_), _, _) => Err(TaskDomainError::AmbiguousAssignee),
        }
    }
}
