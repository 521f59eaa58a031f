//! Notification recipients.

use crate::directory::domain::{ClientId, CompanyId, InternalUserId};
use crate::task::domain::{ActorId, Assignee, ParseKindError};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Storage discriminator for [`Recipient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    /// Internal staff member.
    InternalUser,
    /// External client.
    Client,
}

impl RecipientKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InternalUser => "internal_user",
            Self::Client => "client",
        }
    }
}

impl TryFrom<&str> for RecipientKind {
    type Error = ParseKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "internal_user" => Ok(Self::InternalUser),
            "client" => Ok(Self::Client),
            _ => Err(ParseKindError {
                field: "recipient kind",
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for RecipientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An individual who can receive a notification.
///
/// Companies are never recipients; a company assignment fans out to one
/// client recipient per member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recipient {
    /// Internal staff member.
    InternalUser {
        /// Notified staff member.
        internal_user_id: InternalUserId,
    },
    /// Client notified on behalf of a company.
    Client {
        /// Notified client.
        client_id: ClientId,
        /// Company the notification concerns.
        company_id: CompanyId,
    },
}

impl Recipient {
    /// An internal user recipient.
    #[must_use]
    pub const fn internal_user(internal_user_id: InternalUserId) -> Self {
        Self::InternalUser { internal_user_id }
    }

    /// A client recipient acting for a company.
    #[must_use]
    pub const fn client(client_id: ClientId, company_id: CompanyId) -> Self {
        Self::Client {
            client_id,
            company_id,
        }
    }

    /// Storage discriminator.
    #[must_use]
    pub const fn kind(&self) -> RecipientKind {
        match self {
            Self::InternalUser { .. } => RecipientKind::InternalUser,
            Self::Client { .. } => RecipientKind::Client,
        }
    }

    /// Individual identifier; the uniqueness key together with the task.
    #[must_use]
    pub const fn recipient_id(&self) -> Uuid {
        match self {
            Self::InternalUser { internal_user_id } => internal_user_id.into_inner(),
            Self::Client { client_id, .. } => client_id.into_inner(),
        }
    }

    /// Company context for client recipients.
    #[must_use]
    pub const fn company_id(&self) -> Option<CompanyId> {
        match self {
            Self::InternalUser { .. } => None,
            Self::Client { company_id, .. } => Some(*company_id),
        }
    }

    /// Returns `true` when the recipient is the given actor.
    #[must_use]
    pub fn is_actor(&self, actor: ActorId) -> bool {
        match (self, actor) {
            (Self::InternalUser { internal_user_id }, ActorId::InternalUser(id)) => {
                *internal_user_id == id
            }
            (Self::Client { client_id, .. }, ActorId::Client(id)) => *client_id == id,
            _ => false,
        }
    }

    /// Returns `true` when notifications to this recipient belong to the
    /// assignee. Every member of an assigned company belongs to it.
    #[must_use]
    pub fn belongs_to(&self, assignee: &Assignee) -> bool {
        match (self, assignee) {
            (
                Self::InternalUser { internal_user_id },
                Assignee::InternalUser {
                    internal_user_id: id,
                },
            ) => internal_user_id == id,
            (Self::Client { client_id, .. }, Assignee::Client { client_id: id, .. }) => {
                client_id == id
            }
            (Self::Client { company_id, .. }, Assignee::Company { company_id: id }) => {
                company_id == id
            }
            _ => false,
        }
    }

    /// Rebuilds a recipient from persisted columns.
    ///
    /// # Errors
    ///
    /// Returns [`ParseKindError`] for an unknown kind or a client row without
    /// a company.
    pub fn from_parts(
        kind: &str,
        recipient_id: Uuid,
        company_id: Option<Uuid>,
    ) -> Result<Self, ParseKindError> {
        match (RecipientKind::try_from(kind)?, company_id) {
            (RecipientKind::InternalUser, _) => Ok(Self::internal_user(
                InternalUserId::from_uuid(recipient_id),
            )),
            (RecipientKind::Client, Some(company)) => Ok(Self::client(
                ClientId::from_uuid(recipient_id),
                CompanyId::from_uuid(company),
            )),
            (RecipientKind::Client, None) => Err(ParseKindError {
                field: "client recipient company",
                value: recipient_id.to_string(),
            }),
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.recipient_id())
    }
}
