//! Moderation actions, their records and the audit trail.
//!
//! Admin requests arrive with a free-form `action` tag. They are converted
//! into the closed [`UserAction`] / [`PropertyAction`] enums before any side
//! effect, so every later `match` is exhaustive.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::{PropertyId, UserId};
use crate::error::ValidationError;

/// Length of a temporary suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SuspensionTerm {
    /// No end date.
    Permanent,
    /// Lifted automatically at `until`.
    Until {
        /// End of the suspension.
        until: DateTime<Utc>,
    },
}

impl SuspensionTerm {
    /// `true` for permanent suspensions.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::Permanent)
    }

    /// End date, `None` when permanent.
    #[must_use]
    pub const fn until(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Permanent => None,
            Self::Until { until } => Some(until),
        }
    }
}

/// What happens to a deleted user's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionMode {
    /// Scrub name and phone, soft-delete listings (rows retained).
    Anonymize,
    /// Hard-delete listings; the profile row is kept, marked deleted.
    Purge,
}

/// A moderation action against a user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Record a warning; may trigger the escalation rule.
    Warn {
        /// Mandatory reason.
        reason: String,
    },
    /// Create a suspension and mark the profile suspended.
    Suspend {
        /// Mandatory reason.
        reason: String,
        /// Permanent or temporary.
        term: SuspensionTerm,
    },
    /// Lift every unlifted suspension and reactivate the profile.
    Unsuspend {
        /// Optional reason.
        reason: Option<String>,
    },
    /// Delete the account.
    Delete {
        /// Mandatory reason.
        reason: String,
        /// Anonymize or purge.
        mode: DeletionMode,
    },
}

impl UserAction {
    /// Builds an action from the loose request fields.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidAction`] for an unknown tag
    /// - [`ValidationError::MissingReason`] when a required reason is blank
    /// - [`ValidationError::InvalidSuspensionEnd`] when a temporary
    ///   suspension has no end date or one that is not in the future
    pub fn from_parts(
        action: &str,
        reason: Option<&str>,
        is_permanent: bool,
        suspended_until: Option<DateTime<Utc>>,
        anonymize: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let required = || {
            reason
                .map(str::to_string)
                .ok_or(ValidationError::MissingReason)
        };

        match action {
            "warn" => Ok(Self::Warn {
                reason: required()?,
            }),
            "suspend" => {
                let reason = required()?;
                let term = if is_permanent {
                    SuspensionTerm::Permanent
                } else {
                    match suspended_until {
                        Some(until) if until > now => SuspensionTerm::Until { until },
                        _ => return Err(ValidationError::InvalidSuspensionEnd),
                    }
                };
                Ok(Self::Suspend { reason, term })
            }
            "unsuspend" => Ok(Self::Unsuspend {
                reason: reason.map(str::to_string),
            }),
            "delete" => Ok(Self::Delete {
                reason: required()?,
                mode: if anonymize {
                    DeletionMode::Anonymize
                } else {
                    DeletionMode::Purge
                },
            }),
            _ => Err(ValidationError::InvalidAction),
        }
    }

    /// Audit tag for this action.
    #[must_use]
    pub const fn audit_action(&self) -> AuditAction {
        match self {
            Self::Warn { .. } => AuditAction::Warning,
            Self::Suspend { .. } => AuditAction::Suspension,
            Self::Unsuspend { .. } => AuditAction::Unsuspension,
            Self::Delete { .. } => AuditAction::Deletion,
        }
    }
}

/// Moderation action against a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyActionKind {
    /// Hide the listing.
    Suspend,
    /// Make the listing visible again.
    Activate,
    /// Remove the row.
    Delete,
}

impl PropertyActionKind {
    /// Parses the request tag.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAction`] for unknown tags.
    pub fn parse(action: &str) -> Result<Self, ValidationError> {
        match action {
            "suspend" => Ok(Self::Suspend),
            "activate" => Ok(Self::Activate),
            "delete" => Ok(Self::Delete),
            _ => Err(ValidationError::InvalidAction),
        }
    }

    /// Audit tag for this action.
    #[must_use]
    pub const fn audit_action(self) -> AuditAction {
        match self {
            Self::Suspend => AuditAction::PropertySuspension,
            Self::Activate => AuditAction::PropertyActivation,
            Self::Delete => AuditAction::PropertyDeletion,
        }
    }
}

/// A validated listing moderation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyAction {
    /// Target listing.
    pub property_id: PropertyId,
    /// What to do.
    pub kind: PropertyActionKind,
    /// Optional free-text reason.
    pub reason: Option<String>,
}

/// Action tag stored in `admin_audit_logs.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A warning was issued.
    Warning,
    /// A suspension was created.
    Suspension,
    /// Suspensions were lifted.
    Unsuspension,
    /// An account was deleted.
    Deletion,
    /// A listing was suspended.
    PropertySuspension,
    /// A listing was reactivated.
    PropertyActivation,
    /// A listing was deleted.
    PropertyDeletion,
}

impl AuditAction {
    /// Column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Suspension => "suspension",
            Self::Unsuspension => "unsuspension",
            Self::Deletion => "deletion",
            Self::PropertySuspension => "property_suspension",
            Self::PropertyActivation => "property_activation",
            Self::PropertyDeletion => "property_deletion",
        }
    }
}

/// A stored warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Row id.
    pub id: uuid::Uuid,
    /// Warned user.
    pub user_id: UserId,
    /// Issuing admin.
    pub admin_id: UserId,
    /// Reason given.
    pub reason: String,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

/// A warning about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWarning {
    /// Warned user.
    pub user_id: UserId,
    /// Issuing admin.
    pub admin_id: UserId,
    /// Reason given.
    pub reason: String,
}

/// A stored suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suspension {
    /// Row id.
    pub id: uuid::Uuid,
    /// Suspended user.
    pub user_id: UserId,
    /// Admin who suspended.
    pub admin_id: UserId,
    /// Reason given.
    pub reason: String,
    /// No end date.
    pub is_permanent: bool,
    /// End date for temporary suspensions.
    pub suspended_until: Option<DateTime<Utc>>,
    /// When the suspension was lifted, if it was.
    pub lifted_at: Option<DateTime<Utc>>,
    /// Who lifted it.
    pub lifted_by: Option<UserId>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

impl Suspension {
    /// `true` while not lifted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.lifted_at.is_none()
    }
}

/// A suspension about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSuspension {
    /// Suspended user.
    pub user_id: UserId,
    /// Admin who suspended.
    pub admin_id: UserId,
    /// Reason given.
    pub reason: String,
    /// Permanent or temporary.
    pub term: SuspensionTerm,
}

/// Entity type recorded for listing actions.
pub const PROPERTY_ENTITY_TYPE: &str = "property";

/// An audit entry about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    /// Acting admin.
    pub admin_id: UserId,
    /// Action tag.
    pub action: AuditAction,
    /// Affected user (for listings: the owner).
    pub target_user_id: Option<UserId>,
    /// Entity type for non-user targets.
    pub target_entity_type: Option<&'static str>,
    /// Entity id for non-user targets.
    pub target_entity_id: Option<uuid::Uuid>,
    /// Free-form detail payload.
    pub details: serde_json::Value,
}

/// Escalation rule: `warning_threshold` warnings without an active
/// suspension trigger an automatic temporary suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationPolicy {
    /// Warnings needed to trigger auto-suspension.
    pub warning_threshold: u64,
    /// Length of the automatic suspension.
    pub auto_suspension_days: i64,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            warning_threshold: 3,
            auto_suspension_days: 30,
        }
    }
}

impl ModerationPolicy {
    /// Returns the suspension to create after the `warning_count`-th
    /// warning, or `None` if the threshold is not reached.
    #[must_use]
    pub fn escalation(
        &self,
        target: UserId,
        admin: UserId,
        warning_count: u64,
        already_suspended: bool,
        now: DateTime<Utc>,
    ) -> Option<NewSuspension> {
        if warning_count < self.warning_threshold || already_suspended {
            return None;
        }
        Some(NewSuspension {
            user_id: target,
            admin_id: admin,
            reason: format!("Suspension automatique après {warning_count} avertissements"),
            term: SuspensionTerm::Until {
                until: now + Duration::days(self.auto_suspension_days),
            },
        })
    }
}
