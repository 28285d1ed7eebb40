//! HTTP handlers organized by function group.

pub mod admin;
pub mod payment;
pub mod profile;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all function routes under `/functions/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(payment::routes())
        .merge(admin::routes())
        .merge(profile::routes())
}
