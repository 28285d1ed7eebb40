//! Type-safe identifiers.
//!
//! [`UserId`] and [`PropertyId`] wrap [`uuid::Uuid`] so that a listing id
//! can never be passed where a user id is expected. Both parse from the
//! loose strings found in request bodies and gateway metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identity-provider user id (also the `user_id` column of every table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(uuid::Uuid);

impl UserId {
    /// Creates a new random `UserId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `UserId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Parses a hyphenated UUID string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidUserId`] unless `raw` has the
    /// canonical `8-4-4-4-12` hex shape.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        parse_hyphenated(raw)
            .map(Self)
            .ok_or(ValidationError::InvalidUserId)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<uuid::Uuid> for UserId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<UserId> for uuid::Uuid {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Listing identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(uuid::Uuid);

impl PropertyId {
    /// Creates a new random `PropertyId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `PropertyId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Parses a hyphenated UUID string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPropertyId`] on any other shape.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        parse_hyphenated(raw)
            .map(Self)
            .ok_or(ValidationError::InvalidPropertyId)
    }
}

impl Default for PropertyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Uuid::parse_str` also accepts braced, urn and simple forms; only the
/// hyphenated form is accepted here.
fn parse_hyphenated(raw: &str) -> Option<uuid::Uuid> {
    if raw.len() != 36 {
        return None;
    }
    uuid::Uuid::try_parse(raw).ok()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        assert_ne!(UserId::new(), UserId::new());
        assert_ne!(PropertyId::new(), PropertyId::new());
    }

    #[test]
    fn parse_accepts_hyphenated_uuid_in_any_case() {
        let raw = "3F2504E0-4F89-11D3-9A0C-0305E82C3301";
        let Ok(id) = UserId::parse(raw) else {
            panic!("uppercase uuid should parse");
        };
        assert_eq!(id.to_string(), raw.to_lowercase());
    }

    #[test]
    fn parse_rejects_other_shapes() {
        for raw in [
            "",
            "not-a-uuid",
            "3f2504e04f8911d39a0c0305e82c3301",
            "{3f2504e0-4f89-11d3-9a0c-0305e82c3301}",
            "urn:uuid:3f2504e0-4f89-11d3-9a0c-0305e82c3301",
            "3f2504e0-4f89-11d3-9a0c-0305e82c330g",
        ] {
            assert_eq!(UserId::parse(raw), Err(ValidationError::InvalidUserId));
        }
        assert_eq!(
            PropertyId::parse("42"),
            Err(ValidationError::InvalidPropertyId)
        );
    }

    #[test]
    fn serde_is_transparent() {
        let id = UserId::new();
        let Ok(json) = serde_json::to_string(&id) else {
            panic!("serialization failed");
        };
        assert_eq!(json, format!("\"{id}\""));
    }
}
