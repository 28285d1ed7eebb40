//! Lifecycle states of profiles and listings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Profile lifecycle: `active ⇄ suspended`, either → `deleted` (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    /// Normal account.
    Active,
    /// At least one unlifted suspension.
    Suspended,
    /// Soft-deleted; no further moderation applies.
    Deleted,
}

impl ProfileStatus {
    /// Column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Deleted => "deleted",
        }
    }

    /// `true` once the account has been deleted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown profile status: {other}")),
        }
    }
}

/// Listing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    /// Visible in search.
    Active,
    /// Under offer.
    Reserved,
    /// Hidden by a moderator.
    Suspended,
    /// Awaiting review.
    Pending,
    /// Soft-deleted together with its owner.
    Deleted,
}

impl PropertyStatus {
    /// Column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Reserved => "reserved",
            Self::Suspended => "suspended",
            Self::Pending => "pending",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_status_round_trips_through_column_value() {
        for status in [
            ProfileStatus::Active,
            ProfileStatus::Suspended,
            ProfileStatus::Deleted,
        ] {
            assert_eq!(status.as_str().parse::<ProfileStatus>(), Ok(status));
        }
        assert!("banned".parse::<ProfileStatus>().is_err());
    }

    #[test]
    fn only_deleted_is_terminal() {
        assert!(ProfileStatus::Deleted.is_terminal());
        assert!(!ProfileStatus::Suspended.is_terminal());
        assert!(!ProfileStatus::Active.is_terminal());
    }
}
