//! Error types with HTTP status code mapping.
//!
//! [`FunctionsError`] is the central error type of the service. Each variant
//! maps to an HTTP status code and to a stable, user-facing message. The
//! `Display` text may carry internal detail for the logs; the response body
//! only ever carries [`FunctionsError::public_message`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// JSON error envelope shared by every endpoint.
///
/// ```json
/// { "error": "Montant invalide" }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Localized, non-technical message.
    pub error: String,
}

/// Malformed or out-of-range caller input.
///
/// Messages never echo the offending value back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The request body is not valid JSON for the endpoint.
    #[error("Requête invalide")]
    MalformedBody,
    /// Payment amount missing, non-numeric, non-positive or above the ceiling.
    #[error("Montant invalide")]
    InvalidAmount,
    /// The verified identity carries no email to bill.
    #[error("Email invalide")]
    MissingEmail,
    /// Payment metadata present but not a JSON object.
    #[error("Métadonnées de paiement invalides")]
    InvalidMetadata,
    /// Payment reference outside `[A-Za-z0-9_-]{10,100}`.
    #[error("Référence de paiement invalide")]
    InvalidReference,
    /// Gateway metadata lacks `points` or `user_id`.
    #[error("Données de paiement invalides")]
    InvalidPaymentData,
    /// Points value outside `(0, 1000]` or not a whole number.
    #[error("Valeur de points invalide")]
    InvalidPoints,
    /// User identifier is not a UUID.
    #[error("Identifiant utilisateur invalide")]
    InvalidUserId,
    /// Listing identifier is not a UUID.
    #[error("Identifiant d'annonce invalide")]
    InvalidPropertyId,
    /// A reason is required for this action.
    #[error("Un motif est requis")]
    MissingReason,
    /// Unknown admin action tag.
    #[error("Action invalide")]
    InvalidAction,
    /// Temporary suspension without a future end date.
    #[error("Date de fin de suspension invalide")]
    InvalidSuspensionEnd,
    /// Full name missing or containing disallowed characters.
    #[error("Nom invalide. Utilisez uniquement des lettres, espaces, tirets.")]
    InvalidFullName,
    /// Phone number in an unrecognised format.
    #[error("Format de numéro de téléphone invalide")]
    InvalidPhone,
    /// Account type outside the allowed list.
    #[error("Type de compte invalide")]
    InvalidUserType,
}

/// Kind of entity a [`FunctionsError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A user profile.
    User,
    /// A property listing.
    Property,
}

/// Service error enum with HTTP status code mapping.
///
/// | Status | Variants |
/// |--------|----------|
/// | 400 | `Validation`, `SelfTarget`, `PaymentNotVerified`, `PaymentInitFailed`, `PaymentVerificationFailed` |
/// | 401 | `Unauthenticated` |
/// | 403 | `AdminRequired` |
/// | 404 | `NotFound` |
/// | 408 | `Timeout` |
/// | 409 | `PaymentAlreadyProcessed`, `AlreadySuspended`, `UserDeleted`, `ProfileExists` |
/// | 429 | `RateLimited` |
/// | 500 | `Upstream`, `Configuration`, `Persistence`, `Internal` |
#[derive(Debug, thiserror::Error)]
pub enum FunctionsError {
    /// Missing, malformed, invalid or expired bearer credential.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Valid identity without the admin role.
    #[error("admin access required")]
    AdminRequired,

    /// Caller input failed validation.
    #[error("validation failed: {0:?}")]
    Validation(#[from] ValidationError),

    /// An admin tried to act on their own account.
    #[error("admin action targeted the caller")]
    SelfTarget,

    /// The payment reference already produced a ledger entry.
    #[error("payment reference already processed")]
    PaymentAlreadyProcessed,

    /// The target user already has an unlifted suspension.
    #[error("user already suspended")]
    AlreadySuspended,

    /// The target user is deleted; no further action applies.
    #[error("user is deleted")]
    UserDeleted,

    /// The caller already has a profile.
    #[error("profile already exists")]
    ProfileExists,

    /// Target entity does not exist.
    #[error("{0:?} not found")]
    NotFound(EntityKind),

    /// The gateway did not report the transaction as successful.
    #[error("payment not verified: {0}")]
    PaymentNotVerified(String),

    /// The gateway refused to initialize a transaction.
    #[error("payment initialization rejected: {0}")]
    PaymentInitFailed(String),

    /// The gateway refused a plain verification lookup.
    #[error("payment verification rejected: {0}")]
    PaymentVerificationFailed(String),

    /// The request outlived the configured request timeout.
    #[error("request timed out")]
    Timeout,

    /// Caller exceeded the rate limit.
    #[error("rate limit exceeded; retry after {retry_after_secs} s")]
    RateLimited {
        /// Seconds until the caller may retry.
        retry_after_secs: u64,
    },

    /// Identity provider or gateway unreachable or answering garbage.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// A required secret or setting is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Datastore failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FunctionsError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::SelfTarget
            | Self::PaymentNotVerified(_)
            | Self::PaymentInitFailed(_)
            | Self::PaymentVerificationFailed(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::AdminRequired => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::PaymentAlreadyProcessed
            | Self::AlreadySuspended
            | Self::UserDeleted
            | Self::ProfileExists => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_)
            | Self::Configuration(_)
            | Self::Persistence(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message sent to the caller.
    ///
    /// Never contains upstream bodies, SQL errors or caller input.
    #[must_use]
    pub fn public_message(&self) -> String {
        let message = match self {
            Self::Validation(err) => return err.to_string(),
            Self::Unauthenticated => "Authentification requise",
            Self::AdminRequired => "Accès administrateur requis",
            Self::SelfTarget => "Impossible d'effectuer cette action sur votre propre compte",
            Self::PaymentAlreadyProcessed => "Ce paiement a déjà été traité",
            Self::AlreadySuspended => "Cet utilisateur est déjà suspendu",
            Self::UserDeleted => "Cet utilisateur a été supprimé",
            Self::ProfileExists => "Ce profil existe déjà",
            Self::NotFound(EntityKind::User) => "Utilisateur introuvable",
            Self::NotFound(EntityKind::Property) => "Annonce introuvable",
            Self::PaymentNotVerified(_) => "Paiement non vérifié",
            Self::PaymentInitFailed(_) => "Impossible d'initialiser le paiement",
            Self::PaymentVerificationFailed(_) => "Vérification du paiement échouée",
            Self::Timeout => "Délai de traitement dépassé",
            Self::RateLimited { .. } => "Trop de tentatives. Veuillez réessayer plus tard.",
            Self::Configuration(_) => "Configuration de paiement indisponible",
            Self::Upstream(_) => "Service momentanément indisponible",
            Self::Persistence(_) => "Erreur lors du traitement",
            Self::Internal(_) => "Une erreur est survenue",
        };
        message.to_string()
    }
}

impl IntoResponse for FunctionsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = ErrorResponse {
            error: self.public_message(),
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        if let Self::RateLimited { retry_after_secs } = self {
            response.headers_mut().insert(
                axum::http::header::RETRY_AFTER,
                axum::http::HeaderValue::from(retry_after_secs),
            );
        }
        response
    }
}
