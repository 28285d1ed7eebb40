//! Registration DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{NewProfile, ProfileRecord};
use crate::error::ValidationError;

/// Request body for `POST /register-user`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RegisterUserRequest {
    /// Display name: letters, spaces, `-` and `'`.
    pub full_name: Option<String>,
    /// Optional phone number.
    pub phone: Option<String>,
    /// `chercheur`, `proprietaire`, `agence` or `client`.
    pub user_type: Option<String>,
}

impl RegisterUserRequest {
    /// Sanitizes and validates the fields.
    ///
    /// # Errors
    ///
    /// The [`ValidationError`] of the first invalid field.
    pub fn validate(&self) -> Result<NewProfile, ValidationError> {
        NewProfile::parse(
            self.full_name.as_deref(),
            self.phone.as_deref(),
            self.user_type.as_deref(),
        )
    }
}

/// A stored profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileDto {
    /// Owner id.
    pub user_id: Uuid,
    /// Display name.
    pub full_name: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Account type.
    pub user_type: Option<String>,
    /// Lifecycle status.
    pub status: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRecord> for ProfileDto {
    fn from(p: ProfileRecord) -> Self {
        Self {
            user_id: p.user_id.into(),
            full_name: p.full_name,
            phone: p.phone,
            user_type: p.user_type,
            status: p.status.as_str().to_string(),
            created_at: p.created_at,
        }
    }
}

/// Response body for `POST /register-user` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterUserResponse {
    /// Always `true`.
    pub success: bool,
    /// The created profile.
    pub profile: ProfileDto,
}
