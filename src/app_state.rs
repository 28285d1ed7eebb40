//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::config::FunctionsConfig;
use crate::gateway::PaymentGateway;
use crate::mailer::Mailer;
use crate::persistence::{PrivilegedStore, UserScopedStore};
use crate::rate_limit::RateLimiter;
use crate::service::{
    DashboardService, ListingService, ModerationService, PaymentService, PaymentSettings,
    RegistrationService,
};

/// External collaborators the services are built on.
#[derive(Debug)]
pub struct Backends {
    /// Bearer token verification.
    pub identity: Arc<dyn IdentityProvider>,
    /// Service-role store.
    pub store: Arc<dyn PrivilegedStore>,
    /// Caller-scoped store.
    pub user_store: Arc<dyn UserScopedStore>,
    /// Payment gateway, absent without a secret key.
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    /// Email provider.
    pub mailer: Arc<dyn Mailer>,
    /// Limiter of `initialize-payment`.
    pub payment_limiter: Arc<dyn RateLimiter>,
    /// Limiter of `buy-points`.
    pub points_limiter: Arc<dyn RateLimiter>,
}

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<FunctionsConfig>,
    /// Bearer token verification.
    pub identity: Arc<dyn IdentityProvider>,
    /// Service-role store, used by the admin role check.
    pub store: Arc<dyn PrivilegedStore>,
    /// Payments and points crediting.
    pub payments: Arc<PaymentService>,
    /// User moderation.
    pub moderation: Arc<ModerationService>,
    /// Listing moderation.
    pub listings: Arc<ListingService>,
    /// Admin dashboard.
    pub dashboard: Arc<DashboardService>,
    /// Self-service registration.
    pub registration: Arc<RegistrationService>,
}

impl AppState {
    /// Wires the services onto `backends`.
    #[must_use]
    pub fn new(config: FunctionsConfig, backends: Backends) -> Self {
        let Backends {
            identity,
            store,
            user_store,
            gateway,
            mailer,
            payment_limiter,
            points_limiter,
        } = backends;

        let payments = PaymentService::new(
            Arc::clone(&store),
            gateway,
            payment_limiter,
            points_limiter,
            PaymentSettings::from_config(&config),
        );
        let moderation = ModerationService::new(Arc::clone(&store), config.moderation);

        Self {
            payments: Arc::new(payments),
            moderation: Arc::new(moderation),
            listings: Arc::new(ListingService::new(Arc::clone(&store))),
            dashboard: Arc::new(DashboardService::new(Arc::clone(&store))),
            registration: Arc::new(RegistrationService::new(user_store, mailer)),
            config: Arc::new(config),
            identity,
            store,
        }
    }
}
