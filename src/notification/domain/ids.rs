//! Identifier types for the notification domain.

use crate::ids::uuid_identifier;
use serde::{Deserialize, Serialize};
use std::fmt;

uuid_identifier! {
    /// Unique identifier for a ledger row.
    LedgerEntryId
}

/// Identifier issued by the external notification platform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalNotificationId(String);

impl ExternalNotificationId {
    /// Wraps a platform identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalNotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
