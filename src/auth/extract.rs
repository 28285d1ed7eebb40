//! Axum extractors for authenticated and admin callers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::{Identity, Role};
use crate::error::FunctionsError;

/// A caller whose bearer token was verified by the identity provider.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

/// A verified caller holding the `admin` role.
#[derive(Debug, Clone)]
pub struct AdminIdentity(pub Identity);

/// Extracts the token from `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = FunctionsError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(FunctionsError::Unauthenticated)?;
        let identity = state.identity.verify(token).await?;
        Ok(Self(identity))
    }
}

impl FromRequestParts<AppState> for AdminIdentity {
    type Rejection = FunctionsError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated(identity) = Authenticated::from_request_parts(parts, state).await?;

        match state.store.has_role(identity.id, Role::Admin).await {
            Ok(true) => Ok(Self(identity)),
            Ok(false) => {
                tracing::warn!(user_id = %identity.id, "admin endpoint called by non-admin");
                Err(FunctionsError::AdminRequired)
            }
            Err(e) => {
                tracing::error!(user_id = %identity.id, error = %e, "role lookup failed");
                Err(FunctionsError::AdminRequired)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let Ok(request) = builder.body(()) else {
            panic!("request should build");
        };
        request.into_parts().0
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("abc"))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
