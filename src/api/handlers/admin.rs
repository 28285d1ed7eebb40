//! Admin handlers: user moderation, listing moderation, dashboard.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{
    Dashboard, MessageResponse, PropertyActionRequest, UserActionRequest, UserActionResponse,
};
use crate::api::extract::JsonBody;
use crate::app_state::AppState;
use crate::auth::AdminIdentity;
use crate::error::{ErrorResponse, FunctionsError};

/// `POST /admin-user-actions`: Warn, suspend, unsuspend or delete a user.
///
/// # Errors
///
/// Returns [`FunctionsError`] on validation failures, self-targeting,
/// unknown or deleted targets and storage failures.
#[utoipa::path(
    post,
    path = "/functions/v1/admin-user-actions",
    tag = "Admin",
    summary = "Moderate a user",
    description = "Applies a moderation action to a user account and records it in the audit log. A third warning without an active suspension suspends the user for 30 days.",
    request_body = UserActionRequest,
    responses(
        (status = 200, description = "Action applied", body = UserActionResponse),
        (status = 400, description = "Invalid request or self-targeted action", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse),
        (status = 409, description = "User deleted or already suspended", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn user_action(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    JsonBody(req): JsonBody<UserActionRequest>,
) -> Result<Json<UserActionResponse>, FunctionsError> {
    let (target, action) = req.validate(Utc::now())?;
    let outcome = state.moderation.apply(&admin, target, action).await?;
    Ok(Json(outcome.into()))
}

/// `POST /admin-property-actions`: Suspend, reactivate or delete a listing.
///
/// # Errors
///
/// Returns [`FunctionsError`] on validation failures, unknown listings and
/// storage failures.
#[utoipa::path(
    post,
    path = "/functions/v1/admin-property-actions",
    tag = "Admin",
    summary = "Moderate a listing",
    description = "Changes a listing's status or deletes it, and records the action with the listing title in the audit log.",
    request_body = PropertyActionRequest,
    responses(
        (status = 200, description = "Action applied", body = MessageResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Unknown listing", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn property_action(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    JsonBody(req): JsonBody<PropertyActionRequest>,
) -> Result<Json<MessageResponse>, FunctionsError> {
    let action = req.validate()?;
    let message = state.listings.apply(&admin, &action).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: message.to_string(),
    }))
}

/// `GET|POST /admin-dashboard`: Platform statistics and listings.
///
/// # Errors
///
/// Returns [`FunctionsError`] when any of the reads fails.
#[utoipa::path(
    get,
    path = "/functions/v1/admin-dashboard",
    tag = "Admin",
    summary = "Admin dashboard",
    description = "Aggregates users, listings, points, recent transactions, subscriptions and pending verifications. Also served on POST.",
    responses(
        (status = 200, description = "Dashboard data", body = Dashboard),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn dashboard(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
) -> Result<Json<Dashboard>, FunctionsError> {
    tracing::debug!(admin_id = %admin.id, "dashboard requested");
    Ok(Json(state.dashboard.load().await?))
}

/// Admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin-user-actions", post(user_action))
        .route("/admin-property-actions", post(property_action))
        .route("/admin-dashboard", get(dashboard).post(dashboard))
}
