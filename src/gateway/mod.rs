//! External payment gateway.
//!
//! The service only depends on the [`PaymentGateway`] capability; the
//! production implementation is [`PaystackGateway`]. Upstream bodies end up
//! in [`GatewayFailure`] for logging and are never returned to callers.

pub mod paystack;

use async_trait::async_trait;
use serde::Serialize;

pub use paystack::PaystackGateway;

use crate::domain::PaymentReference;

/// Request to open a hosted payment page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitializeTransaction {
    /// Payer email (taken from the verified identity).
    pub email: String,
    /// Amount in the gateway's minor unit.
    pub amount: u64,
    /// ISO currency code; the gateway default applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Opaque blob echoed back on verification.
    pub metadata: serde_json::Value,
    /// Where the payer is redirected afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Gateway answer to [`PaymentGateway::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializedTransaction {
    /// Hosted payment page.
    pub authorization_url: String,
    /// Gateway access code, when provided.
    pub access_code: Option<String>,
    /// Reference later passed to verification.
    pub reference: String,
}

/// Gateway view of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedTransaction {
    /// Gateway status, `"success"` when paid.
    pub status: String,
    /// Amount in minor units.
    pub amount: u64,
    /// Transaction reference.
    pub reference: String,
    /// Payment time as reported by the gateway.
    pub paid_at: Option<String>,
    /// Metadata echoed back. Untrusted.
    pub metadata: serde_json::Value,
}

impl VerifiedTransaction {
    /// Only the gateway's own `success` status counts as paid.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.status == "success"
    }

    /// Amount in major units.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn amount_major(&self) -> f64 {
        self.amount as f64 / 100.0
    }
}

/// Gateway call failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayFailure {
    /// Network error or timeout.
    #[error("gateway unreachable: {0}")]
    Transport(String),
    /// Non-2xx answer or `status: false`.
    #[error("gateway rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Gateway message, logged only.
        message: String,
    },
    /// Answer did not match the expected envelope.
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

/// Initialize / verify capability of a payment gateway.
#[async_trait]
pub trait PaymentGateway: std::fmt::Debug + Send + Sync {
    /// Opens a transaction and returns the hosted page.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayFailure`] on transport errors, rejections or
    /// unexpected payloads.
    async fn initialize(
        &self,
        request: &InitializeTransaction,
    ) -> Result<InitializedTransaction, GatewayFailure>;

    /// Looks a transaction up by reference.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayFailure`] on transport errors, rejections or
    /// unexpected payloads.
    async fn verify(
        &self,
        reference: &PaymentReference,
    ) -> Result<VerifiedTransaction, GatewayFailure>;
}
