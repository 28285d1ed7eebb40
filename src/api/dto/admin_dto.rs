//! Admin moderation DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    PropertyAction, PropertyActionKind, PropertyId, Suspension, UserAction, UserId, Warning,
};
use crate::error::ValidationError;
use crate::service::ModerationOutcome;

/// Request body for `POST /admin-user-actions`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UserActionRequest {
    /// `warn`, `suspend`, `unsuspend` or `delete`.
    pub action: Option<String>,
    /// Target user id.
    pub target_user_id: Option<String>,
    /// Reason, required except for `unsuspend`.
    pub reason: Option<String>,
    /// Permanent suspension.
    pub is_permanent: Option<bool>,
    /// End of a temporary suspension, RFC 3339.
    pub suspended_until: Option<String>,
    /// Scrub personal data instead of purging listings.
    pub anonymize: Option<bool>,
}

impl UserActionRequest {
    /// Converts the loose body into a target and a closed action.
    ///
    /// # Errors
    ///
    /// The [`ValidationError`] of the first invalid field.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(UserId, UserAction), ValidationError> {
        let action = self
            .action
            .as_deref()
            .ok_or(ValidationError::InvalidAction)?;
        let target = self
            .target_user_id
            .as_deref()
            .ok_or(ValidationError::InvalidUserId)
            .and_then(UserId::parse)?;
        let suspended_until = self
            .suspended_until
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw.trim())
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|_| ValidationError::InvalidSuspensionEnd)
            })
            .transpose()?;

        let action = UserAction::from_parts(
            action,
            self.reason.as_deref(),
            self.is_permanent.unwrap_or(false),
            suspended_until,
            self.anonymize.unwrap_or(false),
            now,
        )?;
        Ok((target, action))
    }
}

/// A stored warning.
#[derive(Debug, Serialize, ToSchema)]
pub struct WarningDto {
    /// Row id.
    pub id: Uuid,
    /// Warned user.
    pub user_id: Uuid,
    /// Issuing admin.
    pub admin_id: Uuid,
    /// Reason.
    pub reason: String,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

impl From<Warning> for WarningDto {
    fn from(w: Warning) -> Self {
        Self {
            id: w.id,
            user_id: w.user_id.into(),
            admin_id: w.admin_id.into(),
            reason: w.reason,
            created_at: w.created_at,
        }
    }
}

/// A stored suspension.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuspensionDto {
    /// Row id.
    pub id: Uuid,
    /// Suspended user.
    pub user_id: Uuid,
    /// Admin who suspended.
    pub admin_id: Uuid,
    /// Reason.
    pub reason: String,
    /// No end date.
    pub is_permanent: bool,
    /// End of a temporary suspension.
    pub suspended_until: Option<DateTime<Utc>>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

impl From<Suspension> for SuspensionDto {
    fn from(s: Suspension) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id.into(),
            admin_id: s.admin_id.into(),
            reason: s.reason,
            is_permanent: s.is_permanent,
            suspended_until: s.suspended_until,
            created_at: s.created_at,
        }
    }
}

/// Response body for `POST /admin-user-actions`.
///
/// Only the fields relevant to the applied action are present.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserActionResponse {
    /// Always `true`.
    pub success: bool,
    /// `warn`: the new warning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<WarningDto>,
    /// `warn`: warnings issued so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_count: Option<u64>,
    /// `warn`: whether the escalation rule fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_suspended: Option<bool>,
    /// `suspend`, or `warn` when escalated: the suspension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspension: Option<SuspensionDto>,
    /// `unsuspend`: rows lifted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifted_count: Option<u64>,
    /// `delete`: listings removed or soft-deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listings_affected: Option<u64>,
}

impl UserActionResponse {
    fn success() -> Self {
        Self {
            success: true,
            warning: None,
            warning_count: None,
            auto_suspended: None,
            suspension: None,
            lifted_count: None,
            listings_affected: None,
        }
    }
}

impl From<ModerationOutcome> for UserActionResponse {
    fn from(outcome: ModerationOutcome) -> Self {
        match outcome {
            ModerationOutcome::Warned {
                warning,
                warning_count,
                auto_suspension,
            } => Self {
                warning: Some(warning.into()),
                warning_count: Some(warning_count),
                auto_suspended: Some(auto_suspension.is_some()),
                suspension: auto_suspension.map(Into::into),
                ..Self::success()
            },
            ModerationOutcome::Suspended { suspension } => Self {
                suspension: Some(suspension.into()),
                ..Self::success()
            },
            ModerationOutcome::Unsuspended { lifted_count } => Self {
                lifted_count: Some(lifted_count),
                ..Self::success()
            },
            ModerationOutcome::Deleted { listings_affected } => Self {
                listings_affected: Some(listings_affected),
                ..Self::success()
            },
        }
    }
}

/// Request body for `POST /admin-property-actions`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyActionRequest {
    /// `suspend`, `activate` or `delete`.
    pub action: Option<String>,
    /// Target listing id.
    pub property_id: Option<String>,
    /// Optional reason.
    pub reason: Option<String>,
}

impl PropertyActionRequest {
    /// Converts the loose body into a closed action.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidAction`] or
    /// [`ValidationError::InvalidPropertyId`].
    pub fn validate(&self) -> Result<PropertyAction, ValidationError> {
        let kind = self
            .action
            .as_deref()
            .ok_or(ValidationError::InvalidAction)
            .and_then(PropertyActionKind::parse)?;
        let property_id = self
            .property_id
            .as_deref()
            .ok_or(ValidationError::InvalidPropertyId)
            .and_then(PropertyId::parse)?;
        Ok(PropertyAction {
            property_id,
            kind,
            reason: self
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        })
    }
}

/// `{success, message}` confirmation.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Always `true`.
    pub success: bool,
    /// Localized confirmation.
    pub message: String,
}
