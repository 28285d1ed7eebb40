//! Self-service registration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{RegisterUserRequest, RegisterUserResponse};
use crate::api::extract::JsonBody;
use crate::app_state::AppState;
use crate::auth::Authenticated;
use crate::error::{ErrorResponse, FunctionsError};

/// `POST /register-user`: Create the caller's profile.
///
/// # Errors
///
/// Returns [`FunctionsError`] on invalid fields, an existing profile or a
/// storage failure.
#[utoipa::path(
    post,
    path = "/functions/v1/register-user",
    tag = "Profiles",
    summary = "Register the caller's profile",
    description = "Validates and inserts the caller's profile under their own credentials, then sends a welcome email.",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Profile created", body = RegisterUserResponse),
        (status = 400, description = "Invalid name, phone or account type", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 409, description = "Profile already exists", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn register_user(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    JsonBody(req): JsonBody<RegisterUserRequest>,
) -> Result<(StatusCode, Json<RegisterUserResponse>), FunctionsError> {
    let profile = req.validate()?;
    let record = state.registration.register(&caller, &profile).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterUserResponse {
            success: true,
            profile: record.into(),
        }),
    ))
}

/// Profile routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/register-user", post(register_user))
}
