//! Test doubles for the external collaborators.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::auth::{IdentityError, IdentityProvider};
use crate::domain::{Identity, PaymentReference};
use crate::gateway::{
    GatewayFailure, InitializeTransaction, InitializedTransaction, PaymentGateway,
    VerifiedTransaction,
};
use crate::mailer::{MailError, Mailer, OutgoingEmail};

/// Maps fixed tokens to identities.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: &str, identity: Identity) -> Self {
        self.tokens.insert(token.to_string(), identity);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Identity, IdentityError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(IdentityError::Rejected)
    }
}

/// Gateway answering from a script of verify responses.
///
/// `initialize` always succeeds with a generated reference unless a
/// failure was scripted with [`ScriptedGateway::fail_initialize`].
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    verifications: Mutex<HashMap<String, Result<VerifiedTransaction, GatewayFailure>>>,
    initialized: Mutex<Vec<InitializeTransaction>>,
    init_failure: Mutex<Option<GatewayFailure>>,
    verify_calls: AtomicUsize,
    counter: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn respond(
        &self,
        reference: &str,
        status: &str,
        amount: u64,
        metadata: serde_json::Value,
    ) {
        self.verifications.lock().await.insert(
            reference.to_string(),
            Ok(VerifiedTransaction {
                status: status.to_string(),
                amount,
                reference: reference.to_string(),
                paid_at: Some("2026-01-15T10:00:00.000Z".to_string()),
                metadata,
            }),
        );
    }

    pub async fn succeed(&self, reference: &str, amount: u64, metadata: serde_json::Value) {
        self.respond(reference, "success", amount, metadata).await;
    }

    pub async fn fail_verify(&self, reference: &str, failure: GatewayFailure) {
        self.verifications
            .lock()
            .await
            .insert(reference.to_string(), Err(failure));
    }

    pub async fn fail_initialize(&self, failure: GatewayFailure) {
        *self.init_failure.lock().await = Some(failure);
    }

    pub async fn last_initialize(&self) -> Option<InitializeTransaction> {
        self.initialized.lock().await.last().cloned()
    }

    pub async fn initialize_calls(&self) -> usize {
        self.initialized.lock().await.len()
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize(
        &self,
        request: &InitializeTransaction,
    ) -> Result<InitializedTransaction, GatewayFailure> {
        self.initialized.lock().await.push(request.clone());
        if let Some(failure) = self.init_failure.lock().await.clone() {
            return Err(failure);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let reference = format!("ref_test{n:06}");
        Ok(InitializedTransaction {
            authorization_url: format!("https://checkout.example/{reference}"),
            access_code: Some(format!("access_{n}")),
            reference,
        })
    }

    async fn verify(
        &self,
        reference: &PaymentReference,
    ) -> Result<VerifiedTransaction, GatewayFailure> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verifications
            .lock()
            .await
            .get(reference.as_str())
            .cloned()
            .unwrap_or_else(|| {
                Err(GatewayFailure::Rejected {
                    status: 404,
                    message: "Transaction reference not found".to_string(),
                })
            })
    }
}

/// Mailer that records instead of sending.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}
