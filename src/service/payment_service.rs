//! Payment service: transaction initialization, verification and points
//! crediting.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::FunctionsConfig;
use crate::domain::{
    CreditOutcome, Identity, PaymentAmount, PaymentReference, PointsCredit, PointsGrant,
    PointsPackage,
};
use crate::error::{FunctionsError, ValidationError};
use crate::gateway::{
    GatewayFailure, InitializeTransaction, InitializedTransaction, PaymentGateway,
    VerifiedTransaction,
};
use crate::persistence::PrivilegedStore;
use crate::rate_limit::{RateDecision, RateLimiter};

/// Ledger `transaction_type` of a points purchase.
pub const PURCHASE_TRANSACTION_TYPE: &str = "purchase";

/// Metadata tag identifying the points-package flow.
pub const POINTS_PURCHASE_TAG: &str = "points_purchase";

/// Static payment settings taken from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSettings {
    /// Currency of generic payments.
    pub currency: String,
    /// Fixed redirect after a generic payment.
    pub callback_url: Option<String>,
    /// Redirect after a points purchase.
    pub points_callback_url: String,
    /// Package sold by the points flow.
    pub package: PointsPackage,
}

impl PaymentSettings {
    /// Extracts the payment settings.
    #[must_use]
    pub fn from_config(config: &FunctionsConfig) -> Self {
        Self {
            currency: config.payment_currency.clone(),
            callback_url: config.payment_callback_url.clone(),
            points_callback_url: config.points_callback_url(),
            package: config.points_package,
        }
    }
}

/// Result of a successful points verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditedPayment {
    /// Points added by this payment.
    pub points: u32,
    /// Balance after crediting.
    pub new_total: i64,
}

/// Orchestrates gateway calls, rate limits and the points ledger.
///
/// The gateway is optional: without a secret key every payment operation
/// fails with [`FunctionsError::Configuration`] while the rest of the
/// service keeps working.
#[derive(Debug)]
pub struct PaymentService {
    store: Arc<dyn PrivilegedStore>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    payment_limiter: Arc<dyn RateLimiter>,
    points_limiter: Arc<dyn RateLimiter>,
    settings: PaymentSettings,
}

impl PaymentService {
    /// Creates a new `PaymentService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn PrivilegedStore>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        payment_limiter: Arc<dyn RateLimiter>,
        points_limiter: Arc<dyn RateLimiter>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            payment_limiter,
            points_limiter,
            settings,
        }
    }

    fn gateway(&self) -> Result<&dyn PaymentGateway, FunctionsError> {
        self.gateway.as_deref().ok_or_else(|| {
            FunctionsError::Configuration("PAYSTACK_SECRET_KEY is not set".to_string())
        })
    }

    async fn enforce(
        limiter: &dyn RateLimiter,
        caller: &Identity,
        flow: &'static str,
    ) -> Result<(), FunctionsError> {
        match limiter.check(&caller.id.to_string()).await {
            RateDecision::Allowed { .. } => Ok(()),
            RateDecision::Denied { retry_after } => {
                tracing::warn!(user_id = %caller.id, flow, "rate limit exceeded");
                Err(FunctionsError::RateLimited {
                    retry_after_secs: retry_after.as_secs().max(1),
                })
            }
        }
    }

    fn billing_email(caller: &Identity) -> Result<String, FunctionsError> {
        caller
            .email
            .clone()
            .ok_or(FunctionsError::Validation(ValidationError::MissingEmail))
    }

    /// Opens a generic payment for the caller.
    ///
    /// `user_id` in the metadata is always overwritten with the caller's id.
    /// Without a configured callback the payer returns to
    /// `<origin>/dashboard?payment=success`.
    ///
    /// # Errors
    ///
    /// Validation, rate-limit, configuration or gateway errors, checked in
    /// that order.
    pub async fn initialize_payment(
        &self,
        caller: &Identity,
        amount: PaymentAmount,
        metadata: Option<Map<String, Value>>,
        origin: Option<&str>,
    ) -> Result<InitializedTransaction, FunctionsError> {
        let email = Self::billing_email(caller)?;
        Self::enforce(self.payment_limiter.as_ref(), caller, "payment").await?;
        let gateway = self.gateway()?;

        let mut metadata = metadata.unwrap_or_default();
        metadata.insert("user_id".to_string(), Value::String(caller.id.to_string()));

        let callback_url = self.settings.callback_url.clone().or_else(|| {
            origin.map(|o| format!("{}/dashboard?payment=success", o.trim_end_matches('/')))
        });

        let request = InitializeTransaction {
            email,
            amount: amount.to_minor_units(),
            currency: Some(self.settings.currency.clone()),
            metadata: Value::Object(metadata),
            callback_url,
        };

        let transaction = gateway
            .initialize(&request)
            .await
            .map_err(initialization_error)?;
        tracing::info!(
            user_id = %caller.id,
            reference = %transaction.reference,
            amount = amount.get(),
            "payment initialized"
        );
        Ok(transaction)
    }

    /// Opens a payment for the fixed points package.
    ///
    /// # Errors
    ///
    /// Rate-limit, configuration, validation or gateway errors.
    pub async fn buy_points(
        &self,
        caller: &Identity,
    ) -> Result<InitializedTransaction, FunctionsError> {
        Self::enforce(self.points_limiter.as_ref(), caller, "points").await?;
        let gateway = self.gateway()?;
        let email = Self::billing_email(caller)?;
        let package = self.settings.package;

        let request = InitializeTransaction {
            email,
            amount: package.price.saturating_mul(100),
            currency: None,
            metadata: serde_json::json!({
                "user_id": caller.id,
                "points": package.points,
                "transaction_type": POINTS_PURCHASE_TAG,
            }),
            callback_url: Some(self.settings.points_callback_url.clone()),
        };

        let transaction = gateway
            .initialize(&request)
            .await
            .map_err(initialization_error)?;
        tracing::info!(
            user_id = %caller.id,
            reference = %transaction.reference,
            points = package.points,
            "points purchase initialized"
        );
        Ok(transaction)
    }

    /// Verifies a payment with the gateway and credits the points it
    /// carries, at most once per reference.
    ///
    /// # Errors
    ///
    /// - [`FunctionsError::PaymentAlreadyProcessed`] if the reference was
    ///   already credited, including by a concurrent call
    /// - [`FunctionsError::PaymentNotVerified`] unless the gateway reports
    ///   success and the paid amount covers the points
    /// - validation errors for malformed metadata
    /// - configuration, upstream or persistence errors
    pub async fn verify_points_payment(
        &self,
        reference: &PaymentReference,
    ) -> Result<CreditedPayment, FunctionsError> {
        let gateway = self.gateway()?;

        if self.store.payment_reference_exists(reference).await? {
            tracing::warn!(%reference, "payment reference replayed");
            return Err(FunctionsError::PaymentAlreadyProcessed);
        }

        let transaction = gateway
            .verify(reference)
            .await
            .map_err(|e| match e {
                GatewayFailure::Rejected { .. } => FunctionsError::PaymentNotVerified(e.to_string()),
                other => FunctionsError::Upstream(other.to_string()),
            })?;

        if !transaction.is_successful() {
            return Err(FunctionsError::PaymentNotVerified(format!(
                "gateway status {}",
                transaction.status
            )));
        }

        let grant = PointsGrant::from_metadata(&transaction.metadata).inspect_err(|e| {
            tracing::warn!(%reference, error = ?e, "verified payment carries invalid metadata");
        })?;
        self.ensure_amount_covers(&transaction, grant.points)?;

        let credit = PointsCredit {
            user_id: grant.user_id,
            points: grant.points,
            transaction_type: PURCHASE_TRANSACTION_TYPE.to_string(),
            description: format!("Achat de {} points", grant.points),
            reference: reference.clone(),
        };

        match self.store.credit_points(&credit).await? {
            CreditOutcome::Credited { new_total } => {
                tracing::info!(
                    user_id = %grant.user_id,
                    %reference,
                    points = grant.points,
                    new_total,
                    "points credited"
                );
                Ok(CreditedPayment {
                    points: grant.points,
                    new_total,
                })
            }
            CreditOutcome::AlreadyProcessed => {
                tracing::warn!(%reference, "payment reference credited concurrently");
                Err(FunctionsError::PaymentAlreadyProcessed)
            }
        }
    }

    /// Rejects payments whose amount is below the package rate for the
    /// points they claim.
    fn ensure_amount_covers(
        &self,
        transaction: &VerifiedTransaction,
        points: u32,
    ) -> Result<(), FunctionsError> {
        let package = self.settings.package;
        if package.points == 0 {
            return Err(FunctionsError::Configuration(
                "points package has zero points".to_string(),
            ));
        }
        let required = (u128::from(points) * u128::from(package.price) * 100)
            .div_ceil(u128::from(package.points));
        if u128::from(transaction.amount) < required {
            return Err(FunctionsError::PaymentNotVerified(format!(
                "paid {} minor units, {points} points require {required}",
                transaction.amount
            )));
        }
        Ok(())
    }

    /// Looks a payment up without crediting anything.
    ///
    /// # Errors
    ///
    /// [`FunctionsError::PaymentVerificationFailed`] when the gateway
    /// rejects the lookup, configuration or upstream errors otherwise.
    pub async fn verify_payment(
        &self,
        reference: &PaymentReference,
    ) -> Result<VerifiedTransaction, FunctionsError> {
        let gateway = self.gateway()?;
        let transaction = gateway.verify(reference).await.map_err(|e| match e {
            GatewayFailure::Rejected { .. } => {
                FunctionsError::PaymentVerificationFailed(e.to_string())
            }
            other => FunctionsError::Upstream(other.to_string()),
        })?;
        tracing::info!(%reference, status = %transaction.status, "payment looked up");
        Ok(transaction)
    }
}

fn initialization_error(failure: GatewayFailure) -> FunctionsError {
    match failure {
        GatewayFailure::Rejected { .. } => FunctionsError::PaymentInitFailed(failure.to_string()),
        other => FunctionsError::Upstream(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::domain::UserId;
    use crate::persistence::MemoryStore;
    use crate::rate_limit::InMemoryRateLimiter;
    use crate::testing::ScriptedGateway;

    struct Harness {
        store: Arc<MemoryStore>,
        gateway: Arc<ScriptedGateway>,
        service: PaymentService,
    }

    fn harness(payment_limit: u32) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(ScriptedGateway::new());
        let service = PaymentService::new(
            Arc::clone(&store) as Arc<dyn PrivilegedStore>,
            Some(Arc::clone(&gateway) as Arc<dyn PaymentGateway>),
            Arc::new(InMemoryRateLimiter::per_hour(payment_limit)),
            Arc::new(InMemoryRateLimiter::per_hour(5)),
            PaymentSettings {
                currency: "XOF".to_string(),
                callback_url: None,
                points_callback_url: "https://fn.example/functions/v1/verify-points-payment"
                    .to_string(),
                package: PointsPackage::default(),
            },
        );
        Harness {
            store,
            gateway,
            service,
        }
    }

    fn caller() -> Identity {
        Identity::new(UserId::new(), Some("awa@example.com".to_string()))
    }

    fn reference(raw: &str) -> PaymentReference {
        let Ok(reference) = PaymentReference::parse(raw) else {
            panic!("valid reference");
        };
        reference
    }

    fn amount(value: f64) -> PaymentAmount {
        let Ok(amount) = PaymentAmount::new(value) else {
            panic!("valid amount");
        };
        amount
    }

    #[tokio::test]
    async fn initialize_overwrites_user_id_and_uses_origin_callback() {
        let h = harness(10);
        let caller = caller();
        let mut metadata = Map::new();
        metadata.insert("user_id".to_string(), json!("someone-else"));
        metadata.insert("points".to_string(), json!(30));

        let Ok(tx) = h
            .service
            .initialize_payment(&caller, amount(5000.0), Some(metadata), Some("https://mikoi.ci/"))
            .await
        else {
            panic!("initialization should succeed");
        };
        assert!(!tx.authorization_url.is_empty());

        let Some(sent) = h.gateway.last_initialize().await else {
            panic!("gateway should have been called");
        };
        assert_eq!(sent.amount, 500_000);
        assert_eq!(sent.currency.as_deref(), Some("XOF"));
        assert_eq!(sent.metadata["user_id"], json!(caller.id.to_string()));
        assert_eq!(sent.metadata["points"], json!(30));
        assert_eq!(
            sent.callback_url.as_deref(),
            Some("https://mikoi.ci/dashboard?payment=success")
        );
    }

    #[tokio::test]
    async fn missing_gateway_is_a_configuration_error() {
        let service = PaymentService::new(
            Arc::new(MemoryStore::new()),
            None,
            Arc::new(InMemoryRateLimiter::per_hour(10)),
            Arc::new(InMemoryRateLimiter::per_hour(5)),
            PaymentSettings {
                currency: "XOF".to_string(),
                callback_url: None,
                points_callback_url: String::new(),
                package: PointsPackage::default(),
            },
        );
        assert!(matches!(
            service.buy_points(&caller()).await,
            Err(FunctionsError::Configuration(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn eleventh_initialization_is_rate_limited_until_window_resets() {
        let h = harness(10);
        let caller = caller();
        for _ in 0..10 {
            assert!(
                h.service
                    .initialize_payment(&caller, amount(1.0), None, None)
                    .await
                    .is_ok()
            );
        }
        assert!(matches!(
            h.service
                .initialize_payment(&caller, amount(1.0), None, None)
                .await,
            Err(FunctionsError::RateLimited { .. })
        ));

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert!(
            h.service
                .initialize_payment(&caller, amount(1.0), None, None)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn buy_points_sends_fixed_package() {
        let h = harness(10);
        let caller = caller();
        assert!(h.service.buy_points(&caller).await.is_ok());

        let Some(sent) = h.gateway.last_initialize().await else {
            panic!("gateway should have been called");
        };
        assert_eq!(sent.amount, 500_000);
        assert_eq!(sent.metadata["points"], json!(30));
        assert_eq!(sent.metadata["transaction_type"], json!("points_purchase"));
        assert_eq!(
            sent.callback_url.as_deref(),
            Some("https://fn.example/functions/v1/verify-points-payment")
        );
    }

    #[tokio::test]
    async fn verification_credits_exactly_once() {
        let h = harness(10);
        let user = UserId::new();
        h.store.set_balance(user, 12).await;
        h.gateway
            .succeed("ref_abc123xyz", 500_000, json!({ "points": 30, "user_id": user }))
            .await;
        let reference = reference("ref_abc123xyz");

        let Ok(credited) = h.service.verify_points_payment(&reference).await else {
            panic!("first verification should credit");
        };
        assert_eq!(credited.new_total, 42);

        assert!(matches!(
            h.service.verify_points_payment(&reference).await,
            Err(FunctionsError::PaymentAlreadyProcessed)
        ));
        assert_eq!(h.store.balance(user).await, Some(42));
        assert_eq!(h.gateway.verify_calls(), 1);
    }

    #[tokio::test]
    async fn unsuccessful_payment_is_not_credited() {
        let h = harness(10);
        let user = UserId::new();
        h.gateway
            .respond("ref_abandoned1", "abandoned", 500_000, json!({ "points": 30, "user_id": user }))
            .await;

        assert!(matches!(
            h.service
                .verify_points_payment(&reference("ref_abandoned1"))
                .await,
            Err(FunctionsError::PaymentNotVerified(_))
        ));
        assert!(h.store.ledger().await.is_empty());
    }

    #[tokio::test]
    async fn underpaid_points_are_refused() {
        let h = harness(10);
        let user = UserId::new();
        h.gateway
            .succeed("ref_cheap12345", 100, json!({ "points": 1000, "user_id": user }))
            .await;

        assert!(matches!(
            h.service
                .verify_points_payment(&reference("ref_cheap12345"))
                .await,
            Err(FunctionsError::PaymentNotVerified(_))
        ));
        assert_eq!(h.store.balance(user).await, None);
    }

    #[tokio::test]
    async fn tampered_metadata_is_rejected() {
        let h = harness(10);
        h.gateway
            .succeed("ref_tamper1234", 500_000, json!({ "points": 30, "user_id": "42" }))
            .await;

        assert!(matches!(
            h.service
                .verify_points_payment(&reference("ref_tamper1234"))
                .await,
            Err(FunctionsError::Validation(ValidationError::InvalidUserId))
        ));
    }

    #[tokio::test]
    async fn plain_verification_does_not_credit() {
        let h = harness(10);
        let user = UserId::new();
        h.gateway
            .succeed("ref_plain12345", 250_000, json!({ "points": 30, "user_id": user }))
            .await;

        let Ok(tx) = h.service.verify_payment(&reference("ref_plain12345")).await else {
            panic!("lookup should succeed");
        };
        assert!(tx.is_successful());
        assert!((tx.amount_major() - 2500.0).abs() < f64::EPSILON);
        assert!(h.store.ledger().await.is_empty());
    }

    #[tokio::test]
    async fn gateway_failures_map_to_caller_and_server_errors() {
        let h = harness(10);
        let caller = caller();

        h.gateway
            .fail_initialize(GatewayFailure::Rejected {
                status: 401,
                message: "Invalid key".to_string(),
            })
            .await;
        assert!(matches!(
            h.service
                .initialize_payment(&caller, amount(5000.0), None, None)
                .await,
            Err(FunctionsError::PaymentInitFailed(_))
        ));

        h.gateway
            .fail_initialize(GatewayFailure::Transport("connection reset".to_string()))
            .await;
        assert!(matches!(
            h.service.buy_points(&caller).await,
            Err(FunctionsError::Upstream(_))
        ));

        h.gateway
            .fail_verify(
                "ref_declined01",
                GatewayFailure::Rejected {
                    status: 400,
                    message: "Transaction declined".to_string(),
                },
            )
            .await;
        h.gateway
            .fail_verify(
                "ref_timeout001",
                GatewayFailure::Transport("timed out".to_string()),
            )
            .await;
        assert!(matches!(
            h.service
                .verify_points_payment(&reference("ref_declined01"))
                .await,
            Err(FunctionsError::PaymentNotVerified(_))
        ));
        assert!(matches!(
            h.service
                .verify_points_payment(&reference("ref_timeout001"))
                .await,
            Err(FunctionsError::Upstream(_))
        ));
        assert!(matches!(
            h.service.verify_payment(&reference("ref_declined01")).await,
            Err(FunctionsError::PaymentVerificationFailed(_))
        ));
        assert!(h.store.ledger().await.is_empty());
    }
}
