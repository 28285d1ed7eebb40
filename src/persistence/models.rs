//! Row types read by the admin dashboard.
//!
//! Numeric columns are cast in SQL (`::float8`, `::int8`) so these structs
//! stay independent of the exact column types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row of `profiles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileRow {
    /// Owner id.
    pub user_id: Uuid,
    /// Display name.
    pub full_name: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Account type tag.
    pub user_type: Option<String>,
    /// Lifecycle status column.
    pub status: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A row of `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PropertyRow {
    /// Listing id.
    pub id: Uuid,
    /// Owner id.
    pub user_id: Uuid,
    /// Title.
    pub title: String,
    /// Asking price.
    pub price: f64,
    /// City.
    pub city: String,
    /// Status column.
    pub status: Option<String>,
    /// Sale or rent.
    pub listing_type: String,
    /// House, flat, land...
    pub property_type: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A row of `user_points`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PointBalanceRow {
    /// Owner id.
    pub user_id: Uuid,
    /// Current balance.
    pub points: i64,
}

/// A row of `points_transactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransactionRow {
    /// Row id.
    pub id: Uuid,
    /// Beneficiary.
    pub user_id: Uuid,
    /// Signed point delta.
    pub amount: i64,
    /// Type tag.
    pub transaction_type: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Gateway reference, unique when present.
    pub payment_reference: Option<String>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

/// A row of `user_subscriptions` joined with its plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionRow {
    /// Subscriber.
    pub user_id: Uuid,
    /// Subscription status.
    pub status: String,
    /// Plan name, if the plan still exists.
    pub plan_name: Option<String>,
    /// Monthly plan price.
    pub price_monthly: Option<f64>,
}

impl SubscriptionRow {
    /// Active subscription to a paid plan.
    #[must_use]
    pub fn is_premium(&self) -> bool {
        self.status == "active" && self.price_monthly.is_some_and(|p| p > 0.0)
    }
}

/// A row of `user_verifications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationRow {
    /// Row id.
    pub id: Uuid,
    /// Applicant.
    pub user_id: Uuid,
    /// Identity, agency...
    pub verification_type: String,
    /// `pending`, `approved`, `rejected`.
    pub status: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// Title and owner of a listing, captured for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PropertySummary {
    /// Listing id.
    pub id: Uuid,
    /// Owner id.
    pub user_id: Uuid,
    /// Title at the time of the action.
    pub title: String,
}
