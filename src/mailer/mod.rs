//! Transactional email.

pub mod resend;

use async_trait::async_trait;
use serde::Serialize;

pub use resend::ResendMailer;

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    /// Recipients.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

impl OutgoingEmail {
    /// Welcome message sent after registration.
    #[must_use]
    pub fn welcome(to: &str, full_name: &str) -> Self {
        let name = if full_name.trim().is_empty() {
            "cher utilisateur".to_string()
        } else {
            escape_html(full_name)
        };
        Self {
            to: vec![to.to_string()],
            subject: "Bienvenue sur MikoiCI !".to_string(),
            html: format!(
                "<!DOCTYPE html><html><body style=\"font-family: Arial, sans-serif; \
                 line-height: 1.6; color: #333;\">\
                 <div style=\"max-width: 600px; margin: 0 auto; padding: 20px;\">\
                 <h1>Bienvenue sur MikoiCI !</h1>\
                 <h2>Bonjour {name} !</h2>\
                 <p>Nous sommes ravis de vous accueillir sur MikoiCI, la plateforme de \
                 référence pour l'immobilier en Côte d'Ivoire.</p>\
                 <p>Avec MikoiCI, vous pouvez :</p><ul>\
                 <li>Rechercher des propriétés à vendre ou à louer</li>\
                 <li>Publier vos propres annonces</li>\
                 <li>Contacter directement les propriétaires</li>\
                 <li>Sauvegarder vos propriétés favorites</li></ul>\
                 <p>Vous avez reçu <strong>6 points gratuits</strong> pour commencer à \
                 publier vos annonces !</p>\
                 <p>Cordialement,<br>L'équipe MikoiCI</p></div></body></html>"
            ),
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Email delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// No provider key configured.
    #[error("email provider not configured")]
    NotConfigured,
    /// Network error or timeout.
    #[error("email provider unreachable: {0}")]
    Transport(String),
    /// Provider refused the message.
    #[error("email provider rejected the message ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Provider body, logged only.
        message: String,
    },
}

/// Email sending capability.
#[async_trait]
pub trait Mailer: std::fmt::Debug + Send + Sync {
    /// Sends one email.
    ///
    /// # Errors
    ///
    /// Returns a [`MailError`] when the message was not accepted.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}
