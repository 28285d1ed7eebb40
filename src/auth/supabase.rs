//! Identity provider backed by the auth service's `/auth/v1/user` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{IdentityError, IdentityProvider};
use crate::domain::{Identity, UserId};

/// Calls `GET {base}/auth/v1/user` with the caller's token.
#[derive(Debug, Clone)]
pub struct SupabaseIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
}

impl SupabaseIdentityProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, anon_key))
    }

    /// Creates a provider around an existing client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Identity, IdentityError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(status = status.as_u16(), "identity provider rejected token");
            return Err(IdentityError::Rejected);
        }
        if !status.is_success() {
            return Err(IdentityError::Unavailable(format!(
                "identity provider answered {status}"
            )));
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("malformed user payload: {e}")))?;
        let id = UserId::parse(&user.id).map_err(|_| {
            IdentityError::Unavailable("identity provider returned a non-uuid id".to_string())
        })?;

        Ok(Identity::new(id, user.email.filter(|e| !e.is_empty())))
    }
}
