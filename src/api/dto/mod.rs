//! Data Transfer Objects for REST request/response serialization.
//!
//! Request bodies keep every field optional and loosely typed; the
//! `validate` methods turn them into domain types so that a bad field is
//! reported with its own message instead of a generic parse failure.

pub mod admin_dto;
pub mod payment_dto;
pub mod profile_dto;

pub use admin_dto::*;
pub use payment_dto::*;
pub use profile_dto::*;
pub use crate::service::dashboard_service::{
    CityCount, Dashboard, DashboardProperty, DashboardStats, DashboardTransaction, DashboardUser,
    DashboardVerification,
};
