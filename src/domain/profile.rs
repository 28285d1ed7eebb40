//! Profile registration input.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use super::{ProfileStatus, UserId};
use crate::error::ValidationError;

const MAX_FULL_NAME_CHARS: usize = 200;
const MAX_PHONE_CHARS: usize = 30;

#[allow(clippy::expect_used)]
static FULL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\s\-']+$").expect("valid full name pattern"));

#[allow(clippy::expect_used)]
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+[0-9]{1,4}[\s-]?)?[0-9\s-]{8,20}$").expect("valid phone pattern")
});

/// Account types a member may register as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Looking for a property.
    Chercheur,
    /// Private owner.
    Proprietaire,
    /// Real-estate agency.
    Agence,
    /// Generic client.
    Client,
}

impl UserType {
    /// Parses the whitelisted tag.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidUserType`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "chercheur" => Ok(Self::Chercheur),
            "proprietaire" => Ok(Self::Proprietaire),
            "agence" => Ok(Self::Agence),
            "client" => Ok(Self::Client),
            _ => Err(ValidationError::InvalidUserType),
        }
    }

    /// Column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chercheur => "chercheur",
            Self::Proprietaire => "proprietaire",
            Self::Agence => "agence",
            Self::Client => "client",
        }
    }
}

/// Validated registration data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    /// Trimmed display name.
    pub full_name: String,
    /// Trimmed phone, if given.
    pub phone: Option<String>,
    /// Account type.
    pub user_type: UserType,
}

impl NewProfile {
    /// Sanitizes and validates raw registration fields.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the first invalid field, checked
    /// in the order name, phone, user type.
    pub fn parse(
        full_name: Option<&str>,
        phone: Option<&str>,
        user_type: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let full_name = full_name
            .map(|raw| truncate(raw.trim(), MAX_FULL_NAME_CHARS))
            .filter(|name| FULL_NAME_RE.is_match(name))
            .ok_or(ValidationError::InvalidFullName)?;

        let phone = phone
            .map(|raw| truncate(raw.trim(), MAX_PHONE_CHARS))
            .filter(|p| !p.is_empty());
        if let Some(p) = &phone
            && !PHONE_RE.is_match(p.trim())
        {
            return Err(ValidationError::InvalidPhone);
        }

        let user_type = user_type
            .ok_or(ValidationError::InvalidUserType)
            .and_then(UserType::parse)?;

        Ok(Self {
            full_name,
            phone,
            user_type,
        })
    }
}

fn truncate(raw: &str, max_chars: usize) -> String {
    raw.chars().take(max_chars).collect()
}

/// A stored profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRecord {
    /// Owner.
    pub user_id: UserId,
    /// Display name.
    pub full_name: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Account type tag.
    pub user_type: Option<String>,
    /// Lifecycle status.
    pub status: ProfileStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}
