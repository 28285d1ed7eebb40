//! Resend HTTP API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{MailError, Mailer, OutgoingEmail};

/// Sends through `POST {base}/emails`.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    from: String,
}

impl std::fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendMailer")
            .field("base_url", &self.base_url)
            .field("configured", &self.api_key.is_some())
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

impl ResendMailer {
    /// Creates a mailer. A `None` key makes every send fail with
    /// [`MailError::NotConfigured`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            from: from.into(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let api_key = self.api_key.as_deref().ok_or(MailError::NotConfigured)?;

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(api_key)
            .json(&SendRequest {
                from: &self.from,
                to: &email.to,
                subject: &email.subject,
                html: &email.html,
            })
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
