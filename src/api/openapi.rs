//! OpenAPI document for every endpoint.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::dto;
use crate::api::handlers::{admin, payment, profile, system};
use crate::error::ErrorResponse;

/// Registers the `bearer` scheme referenced by authenticated routes.
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Generated API description, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "mikoi-functions", description = "Privileged functions of the MikoiCI marketplace"),
    paths(
        payment::initialize_payment,
        payment::buy_points,
        payment::verify_payment,
        payment::verify_points_payment,
        payment::verify_points_payment_redirect,
        admin::user_action,
        admin::property_action,
        admin::dashboard,
        profile::register_user,
        system::health_handler,
    ),
    components(schemas(
        ErrorResponse,
        dto::InitializePaymentRequest,
        dto::InitializePaymentResponse,
        dto::BuyPointsResponse,
        dto::ReferenceRequest,
        dto::PointsCreditedResponse,
        dto::PaymentLookupResponse,
        dto::UserActionRequest,
        dto::UserActionResponse,
        dto::WarningDto,
        dto::SuspensionDto,
        dto::PropertyActionRequest,
        dto::MessageResponse,
        dto::RegisterUserRequest,
        dto::RegisterUserResponse,
        dto::ProfileDto,
        dto::Dashboard,
        dto::DashboardStats,
        dto::CityCount,
        dto::DashboardUser,
        dto::DashboardProperty,
        dto::DashboardTransaction,
        dto::DashboardVerification,
        system::HealthResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Payments", description = "Gateway transactions and points crediting"),
        (name = "Admin", description = "Moderation and dashboard, admin role required"),
        (name = "Profiles", description = "Self-service registration"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;
