//! Payment handlers: initialize, buy points, verify.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::ORIGIN;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{
    BuyPointsResponse, InitializePaymentRequest, InitializePaymentResponse, PaymentLookupResponse,
    PointsCreditedResponse, ReferenceRequest,
};
use crate::api::extract::{JsonBody, QueryParams};
use crate::app_state::AppState;
use crate::auth::Authenticated;
use crate::error::{ErrorResponse, FunctionsError};

/// `POST /initialize-payment`: Open a gateway transaction.
///
/// # Errors
///
/// Returns [`FunctionsError`] on validation, rate-limit, configuration or
/// gateway failures.
#[utoipa::path(
    post,
    path = "/functions/v1/initialize-payment",
    tag = "Payments",
    summary = "Initialize a payment",
    description = "Opens a transaction on the payment gateway for the authenticated caller. The email and user id come from the verified identity, never from the body.",
    request_body = InitializePaymentRequest,
    responses(
        (status = 200, description = "Transaction opened", body = InitializePaymentResponse),
        (status = 400, description = "Invalid amount or gateway rejection", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
        (status = 500, description = "Payment configuration unavailable", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn initialize_payment(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    headers: HeaderMap,
    JsonBody(req): JsonBody<InitializePaymentRequest>,
) -> Result<Json<InitializePaymentResponse>, FunctionsError> {
    let (amount, metadata) = req.validate()?;
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    let transaction = state
        .payments
        .initialize_payment(&caller, amount, metadata, origin)
        .await?;
    Ok(Json(transaction.into()))
}

/// `POST /buy-points`: Buy the fixed points package.
///
/// # Errors
///
/// Returns [`FunctionsError`] on rate-limit, configuration or gateway
/// failures.
#[utoipa::path(
    post,
    path = "/functions/v1/buy-points",
    tag = "Payments",
    summary = "Buy the points package",
    description = "Opens a gateway transaction for the fixed points package. The callback points at verify-points-payment.",
    responses(
        (status = 200, description = "Transaction opened", body = BuyPointsResponse),
        (status = 400, description = "Gateway rejection", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
        (status = 500, description = "Payment configuration unavailable", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn buy_points(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<BuyPointsResponse>, FunctionsError> {
    let transaction = state.payments.buy_points(&caller).await?;
    Ok(Json(transaction.into()))
}

async fn credit(
    state: &AppState,
    req: &ReferenceRequest,
) -> Result<Json<PointsCreditedResponse>, FunctionsError> {
    let reference = req.validate()?;
    let credited = state.payments.verify_points_payment(&reference).await?;
    Ok(Json(credited.into()))
}

/// `POST /verify-points-payment`: Verify a payment and credit its points.
///
/// # Errors
///
/// Returns [`FunctionsError`] when the reference is malformed or already
/// processed, the payment is not verified, or crediting fails.
#[utoipa::path(
    post,
    path = "/functions/v1/verify-points-payment",
    tag = "Payments",
    summary = "Verify a points payment",
    description = "Verifies the transaction with the gateway and credits the points from its metadata. A reference is credited at most once.",
    request_body = ReferenceRequest,
    responses(
        (status = 200, description = "Points credited", body = PointsCreditedResponse),
        (status = 400, description = "Invalid reference or payment not verified", body = ErrorResponse),
        (status = 409, description = "Payment already processed", body = ErrorResponse),
        (status = 500, description = "Configuration, gateway or storage failure", body = ErrorResponse),
    )
)]
pub async fn verify_points_payment(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ReferenceRequest>,
) -> Result<Json<PointsCreditedResponse>, FunctionsError> {
    credit(&state, &req).await
}

/// `GET /verify-points-payment?reference=…`: Gateway redirect target.
///
/// # Errors
///
/// Same as the `POST` form.
#[utoipa::path(
    get,
    path = "/functions/v1/verify-points-payment",
    tag = "Payments",
    summary = "Verify a points payment (redirect)",
    description = "Query-string form of verify-points-payment, used as the gateway callback URL.",
    params(ReferenceRequest),
    responses(
        (status = 200, description = "Points credited", body = PointsCreditedResponse),
        (status = 400, description = "Invalid reference or payment not verified", body = ErrorResponse),
        (status = 409, description = "Payment already processed", body = ErrorResponse),
    )
)]
pub async fn verify_points_payment_redirect(
    State(state): State<AppState>,
    QueryParams(req): QueryParams<ReferenceRequest>,
) -> Result<Json<PointsCreditedResponse>, FunctionsError> {
    credit(&state, &req).await
}

/// `POST /verify-payment`: Look a payment up without crediting.
///
/// # Errors
///
/// Returns [`FunctionsError`] when the reference is malformed or the
/// gateway rejects the lookup.
#[utoipa::path(
    post,
    path = "/functions/v1/verify-payment",
    tag = "Payments",
    summary = "Look up a payment",
    description = "Returns the gateway's view of a transaction. Nothing is credited.",
    request_body = ReferenceRequest,
    responses(
        (status = 200, description = "Transaction found", body = PaymentLookupResponse),
        (status = 400, description = "Invalid reference or verification failed", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    JsonBody(req): JsonBody<ReferenceRequest>,
) -> Result<Json<PaymentLookupResponse>, FunctionsError> {
    let reference = req.validate()?;
    tracing::debug!(user_id = %caller.id, %reference, "payment lookup requested");
    let transaction = state.payments.verify_payment(&reference).await?;
    Ok(Json(transaction.into()))
}

/// Payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/initialize-payment", post(initialize_payment))
        .route("/buy-points", post(buy_points))
        .route("/verify-payment", post(verify_payment))
        .route(
            "/verify-points-payment",
            post(verify_points_payment).get(verify_points_payment_redirect),
        )
}
