//! Paystack REST client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{
    GatewayFailure, InitializeTransaction, InitializedTransaction, PaymentGateway,
    VerifiedTransaction,
};
use crate::domain::PaymentReference;

/// Longest upstream body kept in a failure message.
const MAX_LOGGED_BODY: usize = 512;

/// Client for `POST /transaction/initialize` and
/// `GET /transaction/verify/{reference}`.
#[derive(Clone)]
pub struct PaystackGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl std::fmt::Debug for PaystackGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackGateway")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// `{status, message, data}` envelope wrapping every answer.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: Option<String>,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: u64,
    reference: String,
    paid_at: Option<String>,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl PaystackGateway {
    /// Creates a gateway client with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, secret_key))
    }

    /// Creates a gateway client around an existing HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayFailure> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayFailure::Transport(e.to_string()))?;

        let envelope: Envelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(GatewayFailure::Malformed(e.to_string()));
            }
            Err(_) => {
                return Err(GatewayFailure::Rejected {
                    status: status.as_u16(),
                    message: body.chars().take(MAX_LOGGED_BODY).collect(),
                });
            }
        };

        if !status.is_success() || !envelope.status {
            return Err(GatewayFailure::Rejected {
                status: status.as_u16(),
                message: envelope.message,
            });
        }

        serde_json::from_value(envelope.data).map_err(|e| GatewayFailure::Malformed(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(
        &self,
        request: &InitializeTransaction,
    ) -> Result<InitializedTransaction, GatewayFailure> {
        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayFailure::Transport(e.to_string()))?;

        let data: InitializeData = Self::read(response).await?;
        Ok(InitializedTransaction {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify(
        &self,
        reference: &PaymentReference,
    ) -> Result<VerifiedTransaction, GatewayFailure> {
        let response = self
            .client
            .get(format!("{}/transaction/verify/{reference}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayFailure::Transport(e.to_string()))?;

        let data: VerifyData = Self::read(response).await?;
        Ok(VerifiedTransaction {
            status: data.status,
            amount: data.amount,
            reference: data.reference,
            paid_at: data.paid_at,
            metadata: data.metadata,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_secret() {
        let gateway = PaystackGateway::with_client(
            reqwest::Client::new(),
            "https://api.paystack.co/",
            "sk_test_hidden",
        );
        let rendered = format!("{gateway:?}");
        assert!(!rendered.contains("sk_test_hidden"));
        assert!(rendered.contains("https://api.paystack.co"));
    }

    #[test]
    fn verify_payload_tolerates_missing_metadata() {
        let Ok(data) = serde_json::from_value::<VerifyData>(serde_json::json!({
            "status": "abandoned",
            "amount": 500000,
            "reference": "ref_abc123xyz",
            "paid_at": null
        })) else {
            panic!("payload should deserialize");
        };
        assert!(data.metadata.is_null());
        assert_eq!(data.amount, 500_000);
    }
}
