//! Self-service profile creation and the welcome email.

use std::sync::Arc;

use crate::domain::{Identity, NewProfile, ProfileRecord};
use crate::error::FunctionsError;
use crate::mailer::{MailError, Mailer, OutgoingEmail};
use crate::persistence::UserScopedStore;

/// Creates the caller's own profile through the caller-scoped store.
#[derive(Debug)]
pub struct RegistrationService {
    store: Arc<dyn UserScopedStore>,
    mailer: Arc<dyn Mailer>,
}

impl RegistrationService {
    /// Creates a new `RegistrationService`.
    #[must_use]
    pub fn new(store: Arc<dyn UserScopedStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer }
    }

    /// Inserts the profile, then sends the welcome email.
    ///
    /// Email failures are logged; the profile is created either way.
    ///
    /// # Errors
    ///
    /// - [`FunctionsError::ProfileExists`] when the caller already has one
    /// - persistence errors
    pub async fn register(
        &self,
        caller: &Identity,
        profile: &NewProfile,
    ) -> Result<ProfileRecord, FunctionsError> {
        if self.store.find_own_profile(caller).await?.is_some() {
            return Err(FunctionsError::ProfileExists);
        }
        let record = self.store.insert_own_profile(caller, profile).await?;
        tracing::info!(user_id = %caller.id, user_type = profile.user_type.as_str(), "profile created");

        match &caller.email {
            Some(email) => {
                let message = OutgoingEmail::welcome(email, &profile.full_name);
                match self.mailer.send(&message).await {
                    Ok(()) => tracing::info!(user_id = %caller.id, "welcome email sent"),
                    Err(MailError::NotConfigured) => {
                        tracing::warn!("email provider not configured, welcome email skipped");
                    }
                    Err(e) => {
                        tracing::error!(user_id = %caller.id, error = %e, "welcome email failed");
                    }
                }
            }
            None => tracing::debug!(user_id = %caller.id, "no email on identity, welcome skipped"),
        }

        Ok(record)
    }
}
