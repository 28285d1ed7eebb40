//! HTTP layer: route handlers, DTOs, and router composition.
//!
//! Functions are mounted under `/functions/v1`, the health check at the
//! root. CORS is open to any origin, as browser clients call the functions
//! directly with their own bearer token.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod openapi;

use axum::error_handling::HandleErrorLayer;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method};
use axum::{BoxError, Router};
use tower::ServiceBuilder;
use tower::timeout::error::Elapsed;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::error::FunctionsError;

/// Headers browser clients send with every call.
const ALLOWED_HEADERS: [HeaderName; 4] = [
    AUTHORIZATION,
    HeaderName::from_static("x-client-info"),
    HeaderName::from_static("apikey"),
    CONTENT_TYPE,
];

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(ALLOWED_HEADERS)
}

/// Turns middleware failures into the error envelope.
async fn handle_middleware_error(err: BoxError) -> FunctionsError {
    if err.is::<Elapsed>() {
        FunctionsError::Timeout
    } else {
        FunctionsError::Internal(err.to_string())
    }
}

/// Builds the complete application: routes, middleware and state.
pub fn build_router(state: AppState) -> Router {
    let timeout = state.config.request_timeout();

    let router = Router::new()
        .nest("/functions/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(timeout),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::response::IntoResponse;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::app_state::Backends;
    use crate::config::FunctionsConfig;
    use crate::domain::{Identity, ProfileStatus, PropertyStatus, Suspension, UserId};
    use crate::gateway::{GatewayFailure, PaymentGateway};
    use crate::persistence::{MemoryStore, PrivilegedStore, SubscriptionRow, UserScopedStore};
    use crate::rate_limit::InMemoryRateLimiter;
    use crate::testing::{RecordingMailer, ScriptedGateway, StaticIdentityProvider};

    const ADMIN_TOKEN: &str = "admin-token";
    const USER_TOKEN: &str = "user-token";

    struct TestApp {
        router: Router,
        store: Arc<MemoryStore>,
        gateway: Arc<ScriptedGateway>,
        admin: Identity,
        user: Identity,
    }

    impl TestApp {
        fn new() -> Self {
            let admin = Identity::new(UserId::new(), Some("admin@mikoi.ci".to_string()));
            let user = Identity::new(UserId::new(), Some("awa@example.ci".to_string()));
            let store = Arc::new(MemoryStore::with_admins(&[admin.id]));
            let gateway = Arc::new(ScriptedGateway::new());
            let identity = StaticIdentityProvider::new()
                .with(ADMIN_TOKEN, admin.clone())
                .with(USER_TOKEN, user.clone());
            let config = FunctionsConfig::default();

            let state = AppState::new(
                config.clone(),
                Backends {
                    identity: Arc::new(identity),
                    store: Arc::clone(&store) as Arc<dyn PrivilegedStore>,
                    user_store: Arc::clone(&store) as Arc<dyn UserScopedStore>,
                    gateway: Some(Arc::clone(&gateway) as Arc<dyn PaymentGateway>),
                    mailer: Arc::new(RecordingMailer::new()),
                    payment_limiter: Arc::new(InMemoryRateLimiter::per_hour(
                        config.payment_rate_limit_per_hour,
                    )),
                    points_limiter: Arc::new(InMemoryRateLimiter::per_hour(
                        config.points_rate_limit_per_hour,
                    )),
                },
            );
            Self {
                router: build_router(state),
                store,
                gateway,
                admin,
                user,
            }
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(value) => {
                    builder = builder.header(CONTENT_TYPE, "application/json");
                    Body::from(value.to_string())
                }
                None => Body::empty(),
            };
            let Ok(request) = builder.body(body) else {
                panic!("request should build");
            };
            let Ok(response) = self.router.clone().oneshot(request).await;
            let status = response.status();
            let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
                panic!("body should be readable");
            };
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, value)
        }

        async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
            self.call(Method::POST, uri, token, Some(body)).await
        }
    }

    #[tokio::test]
    async fn same_reference_credits_once() {
        let app = TestApp::new();
        app.store.set_balance(app.user.id, 12).await;
        app.gateway
            .succeed(
                "ref_abc123xyz",
                500_000,
                json!({ "points": 30, "user_id": app.user.id.to_string() }),
            )
            .await;
        let body = json!({ "reference": "ref_abc123xyz" });

        let (status, first) = app
            .post("/functions/v1/verify-points-payment", None, body.clone())
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["points"], 42);

        let (status, second) = app
            .post("/functions/v1/verify-points-payment", None, body)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(second["error"], "Ce paiement a déjà été traité");
        assert_eq!(app.store.balance(app.user.id).await, Some(42));
        assert_eq!(app.store.ledger().await.len(), 1);
    }

    #[tokio::test]
    async fn non_admin_gets_403_without_side_effects() {
        let app = TestApp::new();
        let target = UserId::new();
        app.store
            .seed_profile(target, "Koffi", ProfileStatus::Active)
            .await;

        let (status, body) = app
            .post(
                "/functions/v1/admin-user-actions",
                Some(USER_TOKEN),
                json!({ "action": "suspend", "targetUserId": target.to_string(),
                        "reason": "spam", "isPermanent": true }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Accès administrateur requis");
        assert!(app.store.suspensions(target).await.is_empty());
        assert!(app.store.audit_log().await.is_empty());

        let (status, _) = app
            .call(Method::GET, "/functions/v1/admin-dashboard", Some(USER_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_or_unknown_token_is_401() {
        let app = TestApp::new();
        let (status, body) = app
            .post("/functions/v1/buy-points", None, json!({}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentification requise");

        let (status, _) = app
            .post("/functions/v1/initialize-payment", Some("forged"), json!({ "amount": 10 }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_cannot_target_self() {
        let app = TestApp::new();
        app.store
            .seed_profile(app.admin.id, "Admin", ProfileStatus::Active)
            .await;
        for action in ["warn", "suspend", "delete"] {
            let (status, _) = app
                .post(
                    "/functions/v1/admin-user-actions",
                    Some(ADMIN_TOKEN),
                    json!({ "action": action, "targetUserId": app.admin.id.to_string(),
                            "reason": "test", "isPermanent": true }),
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "action {action}");
        }
        assert!(app.store.suspensions(app.admin.id).await.is_empty());
        let Some(profile) = app.store.profile(app.admin.id).await else {
            panic!("profile should exist");
        };
        assert_eq!(profile.status, ProfileStatus::Active);
    }

    #[tokio::test]
    async fn third_warning_suspends_through_the_api() {
        let app = TestApp::new();
        let target = UserId::new();
        app.store
            .seed_profile(target, "Koffi", ProfileStatus::Active)
            .await;
        app.store.seed_warning(target, app.admin.id, "spam").await;
        app.store.seed_warning(target, app.admin.id, "spam").await;

        let (status, body) = app
            .post(
                "/functions/v1/admin-user-actions",
                Some(ADMIN_TOKEN),
                json!({ "action": "warn", "targetUserId": target.to_string(), "reason": "spam" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["warningCount"], 3);
        assert_eq!(body["autoSuspended"], true);
        assert_eq!(app.store.suspensions(target).await.len(), 1);
    }

    #[tokio::test]
    async fn amount_bounds_are_enforced() {
        let app = TestApp::new();
        for amount in [json!(0), json!(-5), json!("abc"), json!(10_000_001)] {
            let (status, body) = app
                .post(
                    "/functions/v1/initialize-payment",
                    Some(USER_TOKEN),
                    json!({ "amount": amount }),
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}");
            assert_eq!(body["error"], "Montant invalide");
        }
        assert_eq!(app.gateway.initialize_calls().await, 0);
        for amount in [1, 10_000_000] {
            let (status, body) = app
                .post(
                    "/functions/v1/initialize-payment",
                    Some(USER_TOKEN),
                    json!({ "amount": amount }),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "amount {amount}");
            assert!(body["authorization_url"].is_string());
        }
    }

    #[tokio::test]
    async fn malformed_references_never_reach_the_gateway() {
        let app = TestApp::new();
        let long = "a".repeat(101);
        for reference in ["short", long.as_str(), "ref<script>123", "ref abc 12345"] {
            let (status, body) = app
                .post(
                    "/functions/v1/verify-points-payment",
                    None,
                    json!({ "reference": reference }),
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Référence de paiement invalide");
        }
        let (status, _) = app
            .call(
                Method::GET,
                "/functions/v1/verify-points-payment?reference=abc",
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.gateway.verify_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn eleventh_payment_in_an_hour_is_rate_limited() {
        let app = TestApp::new();
        let body = json!({ "amount": 1000 });
        for _ in 0..10 {
            let (status, _) = app
                .post("/functions/v1/initialize-payment", Some(USER_TOKEN), body.clone())
                .await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, error) = app
            .post("/functions/v1/initialize-payment", Some(USER_TOKEN), body.clone())
            .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(error["error"], "Trop de tentatives. Veuillez réessayer plus tard.");

        tokio::time::advance(Duration::from_secs(3601)).await;
        let (status, _) = app
            .post("/functions/v1/initialize-payment", Some(USER_TOKEN), body)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn payment_happy_path() {
        let app = TestApp::new();
        app.store.set_balance(app.user.id, 6).await;

        let (status, opened) = app
            .post(
                "/functions/v1/initialize-payment",
                Some(USER_TOKEN),
                json!({ "amount": 5000, "metadata": { "points": 30 } }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let Some(reference) = opened["reference"].as_str() else {
            panic!("reference expected");
        };
        let Some(sent) = app.gateway.last_initialize().await else {
            panic!("gateway should be called");
        };
        assert_eq!(sent.amount, 500_000);
        assert_eq!(sent.email, "awa@example.ci");
        assert_eq!(sent.metadata["user_id"], app.user.id.to_string());

        app.gateway
            .succeed(reference, sent.amount, sent.metadata.clone())
            .await;
        let (status, credited) = app
            .post(
                "/functions/v1/verify-points-payment",
                None,
                json!({ "reference": reference }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(credited["success"], true);
        assert_eq!(credited["points"], 36);

        let ledger = app.store.ledger().await;
        assert_eq!(ledger.len(), 1);
        assert!(ledger.iter().all(|row| row.amount == 30
            && row.payment_reference.as_deref() == Some(reference)));
    }

    #[tokio::test]
    async fn unsuspend_lifts_the_active_suspension() {
        let app = TestApp::new();
        let target = UserId::new();
        app.store
            .seed_profile(target, "Koffi", ProfileStatus::Suspended)
            .await;
        let now = chrono::Utc::now();
        let lifted = Suspension {
            id: uuid::Uuid::new_v4(),
            user_id: target,
            admin_id: app.admin.id,
            reason: "ancienne".to_string(),
            is_permanent: true,
            suspended_until: None,
            lifted_at: Some(now - chrono::Duration::days(60)),
            lifted_by: Some(app.admin.id),
            created_at: now - chrono::Duration::days(90),
        };
        app.store.seed_suspension(lifted.clone()).await;
        app.store
            .seed_suspension(Suspension {
                id: uuid::Uuid::new_v4(),
                lifted_at: None,
                lifted_by: None,
                created_at: now - chrono::Duration::days(1),
                ..lifted.clone()
            })
            .await;

        let (status, body) = app
            .post(
                "/functions/v1/admin-user-actions",
                Some(ADMIN_TOKEN),
                json!({ "action": "unsuspend", "targetUserId": target.to_string() }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["liftedCount"], 1);

        let rows = app.store.suspensions(target).await;
        assert!(rows.contains(&lifted));
        assert!(rows.iter().all(|s| s.lifted_at.is_some()));
        let Some(profile) = app.store.profile(target).await else {
            panic!("profile should exist");
        };
        assert_eq!(profile.status, ProfileStatus::Active);
    }

    #[tokio::test]
    async fn register_user_then_conflict() {
        let app = TestApp::new();
        let body = json!({ "full_name": "Awa Traoré", "phone": "0707070707", "user_type": "chercheur" });
        let (status, created) = app
            .post("/functions/v1/register-user", Some(USER_TOKEN), body.clone())
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["profile"]["full_name"], "Awa Traoré");

        let (status, _) = app
            .post("/functions/v1/register-user", Some(USER_TOKEN), body)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn malformed_json_uses_error_envelope() {
        let app = TestApp::new();
        let Ok(request) = Request::builder()
            .method(Method::POST)
            .uri("/functions/v1/verify-payment")
            .header(AUTHORIZATION, format!("Bearer {USER_TOKEN}"))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
        else {
            panic!("request should build");
        };
        let Ok(response) = app.router.clone().oneshot(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn preflight_allows_client_headers() {
        let app = TestApp::new();
        let Ok(request) = Request::builder()
            .method(Method::OPTIONS)
            .uri("/functions/v1/initialize-payment")
            .header("origin", "https://mikoi.ci")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "authorization, apikey")
            .body(Body::empty())
        else {
            panic!("request should build");
        };
        let Ok(response) = app.router.clone().oneshot(request).await;
        assert!(response.status().is_success());
        let headers = response.headers();
        assert_eq!(
            headers
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
        let allowed = headers
            .get("access-control-allow-headers")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(allowed.contains("x-client-info"));
    }

    #[tokio::test]
    async fn admin_dashboard_and_listing_actions() {
        let app = TestApp::new();
        let listing = app
            .store
            .seed_property(app.user.id, "Villa Assinie", "Assinie", PropertyStatus::Active)
            .await;

        let (status, body) = app
            .post(
                "/functions/v1/admin-property-actions",
                Some(ADMIN_TOKEN),
                json!({ "action": "suspend", "propertyId": listing.as_uuid().to_string() }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Annonce suspendue");

        app.store
            .seed_subscription(SubscriptionRow {
                user_id: *app.user.id.as_uuid(),
                status: "active".to_string(),
                plan_name: Some("Premium".to_string()),
                price_monthly: Some(2500.0),
            })
            .await;

        let (status, dashboard) = app
            .call(Method::POST, "/functions/v1/admin-dashboard", Some(ADMIN_TOKEN), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["stats"]["totalProperties"], 1);
        assert_eq!(dashboard["stats"]["activeProperties"], 0);
        assert_eq!(dashboard["stats"]["premiumUsers"], 1);
        assert_eq!(dashboard["stats"]["monthlyRevenue"], 2500.0);
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new();
        let (status, body) = app.call(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn unparseable_query_uses_error_envelope() {
        let app = TestApp::new();
        let (status, body) = app
            .call(
                Method::GET,
                "/functions/v1/verify-points-payment?reference=ref_abc123xyz&reference=ref_abc123xyz",
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Requête invalide");
        assert_eq!(app.gateway.verify_calls(), 0);
    }

    #[tokio::test]
    async fn elapsed_request_uses_error_envelope() {
        let response = handle_middleware_error(Box::new(Elapsed::new()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body should be readable");
        };
        let Ok(body) = serde_json::from_slice::<Value>(&bytes) else {
            panic!("timeout body should be JSON");
        };
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn other_middleware_failures_are_internal_errors() {
        let err: BoxError = "service overloaded".into();
        let failure = handle_middleware_error(err).await;
        assert!(matches!(failure, FunctionsError::Internal(_)));
        assert_eq!(failure.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!failure.public_message().contains("overloaded"));
    }

    #[tokio::test]
    async fn gateway_rejection_is_not_echoed() {
        let app = TestApp::new();
        app.gateway
            .fail_initialize(GatewayFailure::Rejected {
                status: 401,
                message: "Invalid key sk_live_secret".to_string(),
            })
            .await;
        let (status, body) = app
            .post(
                "/functions/v1/initialize-payment",
                Some(USER_TOKEN),
                json!({ "amount": 5000 }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Impossible d'initialiser le paiement");
        assert!(!body.to_string().contains("sk_live_secret"));

        app.gateway
            .fail_initialize(GatewayFailure::Transport("dns error: api.paystack.co".to_string()))
            .await;
        let (status, body) = app
            .post("/functions/v1/buy-points", Some(USER_TOKEN), json!({}))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("paystack"));

        app.gateway
            .fail_verify(
                "ref_declined01",
                GatewayFailure::Rejected {
                    status: 400,
                    message: "Declined by issuer".to_string(),
                },
            )
            .await;
        app.gateway
            .fail_verify(
                "ref_timeout001",
                GatewayFailure::Transport("operation timed out".to_string()),
            )
            .await;
        let (status, body) = app
            .post(
                "/functions/v1/verify-points-payment",
                None,
                json!({ "reference": "ref_declined01" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Paiement non vérifié");
        assert!(!body.to_string().contains("issuer"));

        let (status, body) = app
            .post(
                "/functions/v1/verify-points-payment",
                None,
                json!({ "reference": "ref_timeout001" }),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("timed out"));
        assert!(app.store.ledger().await.is_empty());
    }

    #[tokio::test]
    async fn sub_minor_unit_amount_never_reaches_gateway() {
        let app = TestApp::new();
        let (status, body) = app
            .post(
                "/functions/v1/initialize-payment",
                Some(USER_TOKEN),
                json!({ "amount": 0.001 }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Montant invalide");
        assert_eq!(app.gateway.initialize_calls().await, 0);
    }
}
