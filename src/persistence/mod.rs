//! Persistence layer.
//!
//! Access is split into two capabilities:
//!
//! - [`PrivilegedStore`]: service-role operations that bypass row-level
//!   policies (role lookup, ledger, moderation, dashboard reads).
//! - [`UserScopedStore`]: operations performed under the caller's own
//!   identity, subject to row-level policies.
//!
//! Both are implemented by [`PostgresStore`] (`sqlx::PgPool`) and by
//! [`MemoryStore`] for development and tests.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use models::{
    PointBalanceRow, ProfileRow, PropertyRow, PropertySummary, SubscriptionRow, TransactionRow,
    VerificationRow,
};
pub use postgres::PostgresStore;

use crate::domain::{
    CreditOutcome, DeletionMode, Identity, NewAuditEntry, NewProfile, NewSuspension, NewWarning,
    PaymentReference, PointsCredit, ProfileRecord, PropertyId, PropertyStatus, Role, Suspension,
    UserId, Warning,
};
use crate::error::FunctionsError;

/// Placeholder written over the name of an anonymized account.
pub const DELETED_USER_NAME: &str = "Utilisateur supprimé";

/// Service-role datastore access.
///
/// Every method returns [`FunctionsError::Persistence`] on datastore failure
/// unless documented otherwise.
#[async_trait]
pub trait PrivilegedStore: std::fmt::Debug + Send + Sync {
    /// Whether `user` holds `role`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn has_role(&self, user: UserId, role: Role) -> Result<bool, FunctionsError>;

    /// Whether a ledger row already carries `reference`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn payment_reference_exists(
        &self,
        reference: &PaymentReference,
    ) -> Result<bool, FunctionsError>;

    /// Inserts the ledger row and increments the balance atomically.
    ///
    /// A reference that already exists leaves everything untouched and
    /// yields [`CreditOutcome::AlreadyProcessed`].
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure; nothing is
    /// credited in that case.
    async fn credit_points(&self, credit: &PointsCredit) -> Result<CreditOutcome, FunctionsError>;

    /// Loads a profile by owner.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn find_profile(&self, user: UserId) -> Result<Option<ProfileRecord>, FunctionsError>;

    /// Appends a warning.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn insert_warning(&self, warning: &NewWarning) -> Result<Warning, FunctionsError>;

    /// Number of warnings ever issued to `user`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn count_warnings(&self, user: UserId) -> Result<u64, FunctionsError>;

    /// The unlifted suspension of `user`, if any.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn active_suspension(&self, user: UserId)
    -> Result<Option<Suspension>, FunctionsError>;

    /// Inserts a suspension and marks the profile suspended, in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// [`FunctionsError::AlreadySuspended`] if an unlifted suspension
    /// exists, a persistence error otherwise.
    async fn suspend_user(&self, suspension: &NewSuspension) -> Result<Suspension, FunctionsError>;

    /// Lifts every unlifted suspension of `user` and reactivates the
    /// profile, in one transaction. Returns how many rows were lifted.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn lift_suspensions(
        &self,
        user: UserId,
        lifted_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, FunctionsError>;

    /// Marks the profile deleted and handles its listings per `mode`.
    /// Returns how many listings were affected.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn delete_user(&self, user: UserId, mode: DeletionMode) -> Result<u64, FunctionsError>;

    /// Title and owner of a listing.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn find_property(
        &self,
        property: PropertyId,
    ) -> Result<Option<PropertySummary>, FunctionsError>;

    /// Updates a listing status. Returns `false` if the listing is gone.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn set_property_status(
        &self,
        property: PropertyId,
        status: PropertyStatus,
    ) -> Result<bool, FunctionsError>;

    /// Deletes a listing row. Returns `false` if the listing is gone.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn delete_property(&self, property: PropertyId) -> Result<bool, FunctionsError>;

    /// Appends an audit entry.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<(), FunctionsError>;

    /// All profiles, newest first.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn list_profiles(&self) -> Result<Vec<ProfileRow>, FunctionsError>;

    /// All listings, newest first.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn list_properties(&self) -> Result<Vec<PropertyRow>, FunctionsError>;

    /// All point balances.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn list_point_balances(&self) -> Result<Vec<PointBalanceRow>, FunctionsError>;

    /// The `limit` most recent ledger rows.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn recent_transactions(&self, limit: u32) -> Result<Vec<TransactionRow>, FunctionsError>;

    /// All subscriptions with their plan.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionRow>, FunctionsError>;

    /// All verification requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn list_verifications(&self) -> Result<Vec<VerificationRow>, FunctionsError>;

    /// Number of reviews.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn count_reviews(&self) -> Result<u64, FunctionsError>;

    /// Number of favourites.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn count_favorites(&self) -> Result<u64, FunctionsError>;
}

/// Caller-scoped datastore access.
#[async_trait]
pub trait UserScopedStore: std::fmt::Debug + Send + Sync {
    /// The caller's own profile.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on datastore failure.
    async fn find_own_profile(
        &self,
        caller: &Identity,
    ) -> Result<Option<ProfileRecord>, FunctionsError>;

    /// Creates the caller's profile.
    ///
    /// # Errors
    ///
    /// [`FunctionsError::ProfileExists`] if it already exists, a
    /// persistence error otherwise.
    async fn insert_own_profile(
        &self,
        caller: &Identity,
        profile: &NewProfile,
    ) -> Result<ProfileRecord, FunctionsError>;
}
