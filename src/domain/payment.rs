//! Payment and points value objects.
//!
//! Everything that crosses the gateway boundary is parsed into one of these
//! types first. Metadata echoed back by the gateway is treated as untrusted
//! input every time, even though this service wrote it.

use std::fmt;

use serde::Serialize;

use super::UserId;
use crate::error::ValidationError;

/// Largest amount a single payment may request, in major currency units.
pub const MAX_PAYMENT_AMOUNT: f64 = 10_000_000.0;

/// Largest number of points a single verified payment may credit.
pub const MAX_POINTS_PER_PAYMENT: u32 = 1_000;

/// Gateway transaction reference, restricted to `[A-Za-z0-9_-]{10,100}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PaymentReference(String);

impl PaymentReference {
    /// Validates a caller-supplied reference before anything is sent upstream.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidReference`] on length or charset
    /// violations.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let len = raw.len();
        let charset_ok = raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !(10..=100).contains(&len) || !charset_ok {
            return Err(ValidationError::InvalidReference);
        }
        Ok(Self(raw.to_string()))
    }

    /// Borrows the reference text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated payment amount in major currency units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentAmount(f64);

impl PaymentAmount {
    /// Accepts a JSON number in `(0, MAX_PAYMENT_AMOUNT]`.
    ///
    /// Strings are rejected even when they look numeric.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAmount`] otherwise.
    pub fn from_json(value: Option<&serde_json::Value>) -> Result<Self, ValidationError> {
        let amount = value
            .and_then(serde_json::Value::as_f64)
            .ok_or(ValidationError::InvalidAmount)?;
        Self::new(amount)
    }

    /// Validates a raw amount.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAmount`] when the value is not
    /// finite, above [`MAX_PAYMENT_AMOUNT`], or below one minor unit once
    /// rounded.
    pub fn new(amount: f64) -> Result<Self, ValidationError> {
        if !amount.is_finite() || (amount * 100.0).round() < 1.0 || amount > MAX_PAYMENT_AMOUNT
        {
            return Err(ValidationError::InvalidAmount);
        }
        Ok(Self(amount))
    }

    /// Major units as supplied.
    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }

    /// Amount in the gateway's minor unit (×100, rounded).
    #[must_use]
    pub fn to_minor_units(self) -> u64 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let minor = (self.0 * 100.0).round() as u64;
        minor
    }
}

/// Fixed points package sold through the points flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsPackage {
    /// Points credited after payment.
    pub points: u32,
    /// Price in major currency units.
    pub price: u64,
}

impl Default for PointsPackage {
    fn default() -> Self {
        Self {
            points: 30,
            price: 5_000,
        }
    }
}

/// Points credit extracted from verified gateway metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsGrant {
    /// Beneficiary.
    pub user_id: UserId,
    /// Whole points in `(0, MAX_POINTS_PER_PAYMENT]`.
    pub points: u32,
}

impl PointsGrant {
    /// Extracts and validates `{points, user_id}` from gateway metadata.
    ///
    /// Metadata may arrive either as an object or as a JSON-encoded string.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidPaymentData`] if either field is absent
    /// - [`ValidationError::InvalidPoints`] if `points` is not a whole number
    ///   in range
    /// - [`ValidationError::InvalidUserId`] if `user_id` is not a UUID
    pub fn from_metadata(metadata: &serde_json::Value) -> Result<Self, ValidationError> {
        let decoded;
        let metadata = match metadata {
            serde_json::Value::String(raw) => {
                decoded = serde_json::from_str::<serde_json::Value>(raw)
                    .map_err(|_| ValidationError::InvalidPaymentData)?;
                &decoded
            }
            other => other,
        };

        let points = metadata.get("points").filter(|v| is_present(v));
        let user_id = metadata.get("user_id").filter(|v| is_present(v));
        let (Some(points), Some(user_id)) = (points, user_id) else {
            return Err(ValidationError::InvalidPaymentData);
        };

        let points = parse_points(points)?;
        let user_id = match user_id {
            serde_json::Value::String(s) => UserId::parse(s)?,
            _ => return Err(ValidationError::InvalidUserId),
        };

        Ok(Self { user_id, points })
    }
}

fn is_present(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn parse_points(value: &serde_json::Value) -> Result<u32, ValidationError> {
    let raw = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or(ValidationError::InvalidPoints)?;

    if !raw.is_finite()
        || raw <= 0.0
        || raw > f64::from(MAX_POINTS_PER_PAYMENT)
        || raw.fract() != 0.0
    {
        return Err(ValidationError::InvalidPoints);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let points = raw as u32;
    Ok(points)
}

/// A single atomic crediting request for the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsCredit {
    /// Beneficiary.
    pub user_id: UserId,
    /// Points to add.
    pub points: u32,
    /// Ledger `transaction_type`.
    pub transaction_type: String,
    /// Human-readable ledger description.
    pub description: String,
    /// Unique idempotency key.
    pub reference: PaymentReference,
}

/// Result of [`crate::persistence::PrivilegedStore::credit_points`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    /// Ledger row inserted and balance incremented.
    Credited {
        /// Balance after the increment.
        new_total: i64,
    },
    /// A ledger row with this reference already exists; nothing changed.
    AlreadyProcessed,
}
