//! Verified caller identity and application roles.

use serde::Serialize;

use super::UserId;

/// A caller whose bearer credential was confirmed by the identity provider.
///
/// Handlers take the user id and email from here, never from request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Verified user id.
    pub id: UserId,
    /// Verified email, when the account has one.
    pub email: Option<String>,
}

impl Identity {
    /// Creates an identity.
    #[must_use]
    pub fn new(id: UserId, email: Option<String>) -> Self {
        Self { id, email }
    }
}

/// Rows of the protected `user_roles` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Moderation and dashboard access.
    Admin,
    /// Regular member.
    User,
}

impl Role {
    /// Value stored in the `app_role` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}
