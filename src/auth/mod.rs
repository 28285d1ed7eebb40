//! Caller authentication and admin authorization.
//!
//! Bearer tokens are exchanged for an [`Identity`] through an
//! [`IdentityProvider`]. Handlers receive the result through the
//! [`Authenticated`] and [`AdminIdentity`] extractors, which run before the
//! request body is read.

pub mod extract;
pub mod supabase;

use async_trait::async_trait;

pub use extract::{AdminIdentity, Authenticated};
pub use supabase::SupabaseIdentityProvider;

use crate::domain::Identity;
use crate::error::FunctionsError;

/// Why a token could not be turned into an identity.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider refused the token (invalid, expired or revoked).
    #[error("token rejected")]
    Rejected,
    /// The provider could not be reached or answered garbage.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl From<IdentityError> for FunctionsError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected => Self::Unauthenticated,
            IdentityError::Unavailable(detail) => Self::Upstream(detail),
        }
    }
}

/// Token introspection capability.
#[async_trait]
pub trait IdentityProvider: std::fmt::Debug + Send + Sync {
    /// Resolves a bearer token to the identity it was issued for.
    ///
    /// # Errors
    ///
    /// [`IdentityError::Rejected`] for bad tokens,
    /// [`IdentityError::Unavailable`] when the provider cannot answer.
    async fn verify(&self, token: &str) -> Result<Identity, IdentityError>;
}
