//! Payment DTOs: initialization, points purchase and verification.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{PaymentAmount, PaymentReference};
use crate::error::ValidationError;
use crate::gateway::{InitializedTransaction, VerifiedTransaction};
use crate::service::CreditedPayment;

/// Request body for `POST /initialize-payment`.
///
/// Fields stay loosely typed so that a wrong type is reported as an
/// invalid amount or invalid metadata, not as a malformed body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InitializePaymentRequest {
    /// Amount in major currency units, `(0, 10 000 000]`.
    #[schema(value_type = f64)]
    #[serde(default)]
    pub amount: Option<Value>,
    /// Free-form metadata forwarded to the gateway.
    #[schema(value_type = Option<Object>)]
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl InitializePaymentRequest {
    /// Validates the amount and the metadata shape.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidAmount`] or
    /// [`ValidationError::InvalidMetadata`].
    pub fn validate(self) -> Result<(PaymentAmount, Option<Map<String, Value>>), ValidationError> {
        let amount = PaymentAmount::from_json(self.amount.as_ref())?;
        let metadata = match self.metadata {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => return Err(ValidationError::InvalidMetadata),
        };
        Ok((amount, metadata))
    }
}

/// Response body for `POST /initialize-payment`.
#[derive(Debug, Serialize, ToSchema)]
pub struct InitializePaymentResponse {
    /// Hosted payment page.
    pub authorization_url: String,
    /// Gateway access code.
    pub access_code: Option<String>,
    /// Transaction reference to verify later.
    pub reference: String,
}

impl From<InitializedTransaction> for InitializePaymentResponse {
    fn from(t: InitializedTransaction) -> Self {
        Self {
            authorization_url: t.authorization_url,
            access_code: t.access_code,
            reference: t.reference,
        }
    }
}

/// Response body for `POST /buy-points`.
#[derive(Debug, Serialize, ToSchema)]
pub struct BuyPointsResponse {
    /// Hosted payment page.
    pub authorization_url: String,
    /// Transaction reference.
    pub reference: String,
}

impl From<InitializedTransaction> for BuyPointsResponse {
    fn from(t: InitializedTransaction) -> Self {
        Self {
            authorization_url: t.authorization_url,
            reference: t.reference,
        }
    }
}

/// Body of the verification endpoints, also accepted as a query string.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct ReferenceRequest {
    /// Gateway transaction reference.
    #[serde(default)]
    pub reference: Option<String>,
}

impl ReferenceRequest {
    /// Validates the reference format.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidReference`] when missing or malformed.
    pub fn validate(&self) -> Result<PaymentReference, ValidationError> {
        self.reference
            .as_deref()
            .ok_or(ValidationError::InvalidReference)
            .and_then(PaymentReference::parse)
    }
}

/// Response body for `verify-points-payment`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PointsCreditedResponse {
    /// Always `true`.
    pub success: bool,
    /// Balance after crediting.
    pub points: i64,
    /// Confirmation message.
    pub message: String,
}

impl From<CreditedPayment> for PointsCreditedResponse {
    fn from(credited: CreditedPayment) -> Self {
        Self {
            success: true,
            points: credited.new_total,
            message: format!("{} points ajoutés avec succès", credited.points),
        }
    }
}

/// Response body for `POST /verify-payment`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentLookupResponse {
    /// Gateway status.
    pub status: String,
    /// Amount in major units.
    pub amount: f64,
    /// Transaction reference.
    pub reference: String,
    /// Payment time.
    pub paid_at: Option<String>,
    /// Metadata echoed by the gateway.
    #[schema(value_type = Object)]
    pub metadata: Value,
}

impl From<VerifiedTransaction> for PaymentLookupResponse {
    fn from(t: VerifiedTransaction) -> Self {
        let amount = t.amount_major();
        Self {
            status: t.status,
            amount,
            reference: t.reference,
            paid_at: t.paid_at,
            metadata: t.metadata,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(body: Value) -> InitializePaymentRequest {
        let Ok(request) = serde_json::from_value(body) else {
            panic!("body should deserialize");
        };
        request
    }

    #[test]
    fn non_numeric_amount_is_invalid_amount() {
        assert_eq!(
            request(json!({ "amount": "5000" })).validate().err(),
            Some(ValidationError::InvalidAmount)
        );
        assert_eq!(
            request(json!({})).validate().err(),
            Some(ValidationError::InvalidAmount)
        );
    }

    #[test]
    fn metadata_must_be_an_object() {
        assert_eq!(
            request(json!({ "amount": 10, "metadata": [1, 2] }))
                .validate()
                .err(),
            Some(ValidationError::InvalidMetadata)
        );
        let Ok((_, metadata)) = request(json!({ "amount": 10, "metadata": null })).validate()
        else {
            panic!("null metadata is accepted");
        };
        assert!(metadata.is_none());
    }

    #[test]
    fn missing_reference_is_invalid() {
        assert_eq!(
            ReferenceRequest::default().validate().err(),
            Some(ValidationError::InvalidReference)
        );
    }
}
