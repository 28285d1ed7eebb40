//! In-memory store for development (`PERSISTENCE_ENABLED=false`) and tests.
//!
//! A single mutex guards all tables, so every method is atomic with respect
//! to the others. The same integrity rules as the SQL migrations apply:
//! unique payment references and one unlifted suspension per user.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{
    PointBalanceRow, ProfileRow, PropertyRow, PropertySummary, SubscriptionRow, TransactionRow,
    VerificationRow,
};
use super::{DELETED_USER_NAME, PrivilegedStore, UserScopedStore};
use crate::domain::{
    CreditOutcome, DeletionMode, Identity, NewAuditEntry, NewProfile, NewSuspension, NewWarning,
    PaymentReference, PointsCredit, ProfileRecord, ProfileStatus, PropertyId, PropertyStatus,
    Role, Suspension, UserId, Warning,
};
use crate::error::FunctionsError;

#[derive(Debug, Default)]
struct Tables {
    roles: HashSet<(UserId, Role)>,
    profiles: HashMap<UserId, ProfileRecord>,
    properties: Vec<PropertyRow>,
    balances: HashMap<UserId, i64>,
    ledger: Vec<TransactionRow>,
    warnings: Vec<Warning>,
    suspensions: Vec<Suspension>,
    audit: Vec<NewAuditEntry>,
    subscriptions: Vec<SubscriptionRow>,
    verifications: Vec<VerificationRow>,
    reviews: u64,
    favorites: u64,
    fail_audit: bool,
}

impl Tables {
    fn set_profile_status(&mut self, user: UserId, status: ProfileStatus) {
        if let Some(profile) = self.profiles.get_mut(&user) {
            profile.status = status;
        }
    }
}

/// Process-local implementation of [`PrivilegedStore`] and
/// [`UserScopedStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store where `admins` hold the admin role.
    #[must_use]
    pub fn with_admins(admins: &[UserId]) -> Self {
        let tables = Tables {
            roles: admins.iter().map(|id| (*id, Role::Admin)).collect(),
            ..Tables::default()
        };
        Self {
            tables: Mutex::new(tables),
        }
    }

    /// Grants `role` to `user`.
    pub async fn grant_role(&self, user: UserId, role: Role) {
        self.tables.lock().await.roles.insert((user, role));
    }

    /// Inserts or replaces a profile.
    pub async fn seed_profile(&self, user: UserId, full_name: &str, status: ProfileStatus) {
        self.tables.lock().await.profiles.insert(
            user,
            ProfileRecord {
                user_id: user,
                full_name: Some(full_name.to_string()),
                phone: None,
                user_type: None,
                status,
                created_at: Utc::now(),
            },
        );
    }

    /// Inserts a listing and returns its id.
    pub async fn seed_property(
        &self,
        owner: UserId,
        title: &str,
        city: &str,
        status: PropertyStatus,
    ) -> PropertyId {
        let id = PropertyId::new();
        self.tables.lock().await.properties.push(PropertyRow {
            id: *id.as_uuid(),
            user_id: *owner.as_uuid(),
            title: title.to_string(),
            price: 0.0,
            city: city.to_string(),
            status: Some(status.as_str().to_string()),
            listing_type: "location".to_string(),
            property_type: "appartement".to_string(),
            created_at: Utc::now(),
        });
        id
    }

    /// Sets a point balance.
    pub async fn set_balance(&self, user: UserId, points: i64) {
        self.tables.lock().await.balances.insert(user, points);
    }

    /// Inserts a warning row without side effects.
    pub async fn seed_warning(&self, user: UserId, admin: UserId, reason: &str) {
        self.tables.lock().await.warnings.push(Warning {
            id: Uuid::new_v4(),
            user_id: user,
            admin_id: admin,
            reason: reason.to_string(),
            created_at: Utc::now(),
        });
    }

    /// Inserts a suspension row as-is, lifted or not.
    pub async fn seed_suspension(&self, suspension: Suspension) {
        self.tables.lock().await.suspensions.push(suspension);
    }

    /// Adds a subscription row.
    pub async fn seed_subscription(&self, subscription: SubscriptionRow) {
        self.tables.lock().await.subscriptions.push(subscription);
    }

    /// Adds a verification request.
    pub async fn seed_verification(&self, verification: VerificationRow) {
        self.tables.lock().await.verifications.push(verification);
    }

    /// Sets the review and favourite counters.
    pub async fn seed_counts(&self, reviews: u64, favorites: u64) {
        let mut tables = self.tables.lock().await;
        tables.reviews = reviews;
        tables.favorites = favorites;
    }

    /// Makes every audit write fail.
    pub async fn fail_audit_writes(&self, fail: bool) {
        self.tables.lock().await.fail_audit = fail;
    }

    /// Current balance, `None` when no balance row exists.
    pub async fn balance(&self, user: UserId) -> Option<i64> {
        self.tables.lock().await.balances.get(&user).copied()
    }

    /// All ledger rows, oldest first.
    pub async fn ledger(&self) -> Vec<TransactionRow> {
        self.tables.lock().await.ledger.clone()
    }

    /// Stored profile.
    pub async fn profile(&self, user: UserId) -> Option<ProfileRecord> {
        self.tables.lock().await.profiles.get(&user).cloned()
    }

    /// Suspension rows of `user`, oldest first.
    pub async fn suspensions(&self, user: UserId) -> Vec<Suspension> {
        self.tables
            .lock()
            .await
            .suspensions
            .iter()
            .filter(|s| s.user_id == user)
            .cloned()
            .collect()
    }

    /// Audit entries, oldest first.
    pub async fn audit_log(&self) -> Vec<NewAuditEntry> {
        self.tables.lock().await.audit.clone()
    }

    /// Current status column of a listing; `None` once the row is gone.
    pub async fn property_status(&self, property: PropertyId) -> Option<String> {
        self.tables
            .lock()
            .await
            .properties
            .iter()
            .find(|p| p.id == *property.as_uuid())
            .and_then(|p| p.status.clone())
    }

    /// Number of listing rows owned by `user`.
    pub async fn property_count(&self, user: UserId) -> usize {
        self.tables
            .lock()
            .await
            .properties
            .iter()
            .filter(|p| p.user_id == *user.as_uuid())
            .count()
    }
}

fn to_profile_row(profile: &ProfileRecord) -> ProfileRow {
    ProfileRow {
        user_id: *profile.user_id.as_uuid(),
        full_name: profile.full_name.clone(),
        phone: profile.phone.clone(),
        user_type: profile.user_type.clone(),
        status: Some(profile.status.as_str().to_string()),
        created_at: profile.created_at,
    }
}

#[async_trait]
impl PrivilegedStore for MemoryStore {
    async fn has_role(&self, user: UserId, role: Role) -> Result<bool, FunctionsError> {
        Ok(self.tables.lock().await.roles.contains(&(user, role)))
    }

    async fn payment_reference_exists(
        &self,
        reference: &PaymentReference,
    ) -> Result<bool, FunctionsError> {
        Ok(self
            .tables
            .lock()
            .await
            .ledger
            .iter()
            .any(|row| row.payment_reference.as_deref() == Some(reference.as_str())))
    }

    async fn credit_points(&self, credit: &PointsCredit) -> Result<CreditOutcome, FunctionsError> {
        let mut tables = self.tables.lock().await;
        let duplicate = tables
            .ledger
            .iter()
            .any(|row| row.payment_reference.as_deref() == Some(credit.reference.as_str()));
        if duplicate {
            return Ok(CreditOutcome::AlreadyProcessed);
        }

        let points = i64::from(credit.points);
        tables.ledger.push(TransactionRow {
            id: Uuid::new_v4(),
            user_id: *credit.user_id.as_uuid(),
            amount: points,
            transaction_type: credit.transaction_type.clone(),
            description: Some(credit.description.clone()),
            payment_reference: Some(credit.reference.as_str().to_string()),
            created_at: Utc::now(),
        });
        let balance = tables.balances.entry(credit.user_id).or_insert(0);
        *balance += points;
        Ok(CreditOutcome::Credited {
            new_total: *balance,
        })
    }

    async fn find_profile(&self, user: UserId) -> Result<Option<ProfileRecord>, FunctionsError> {
        Ok(self.tables.lock().await.profiles.get(&user).cloned())
    }

    async fn insert_warning(&self, warning: &NewWarning) -> Result<Warning, FunctionsError> {
        let stored = Warning {
            id: Uuid::new_v4(),
            user_id: warning.user_id,
            admin_id: warning.admin_id,
            reason: warning.reason.clone(),
            created_at: Utc::now(),
        };
        self.tables.lock().await.warnings.push(stored.clone());
        Ok(stored)
    }

    async fn count_warnings(&self, user: UserId) -> Result<u64, FunctionsError> {
        let tables = self.tables.lock().await;
        let count = tables.warnings.iter().filter(|w| w.user_id == user).count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn active_suspension(
        &self,
        user: UserId,
    ) -> Result<Option<Suspension>, FunctionsError> {
        Ok(self
            .tables
            .lock()
            .await
            .suspensions
            .iter()
            .rev()
            .find(|s| s.user_id == user && s.is_active())
            .cloned())
    }

    async fn suspend_user(&self, suspension: &NewSuspension) -> Result<Suspension, FunctionsError> {
        let mut tables = self.tables.lock().await;
        if tables
            .suspensions
            .iter()
            .any(|s| s.user_id == suspension.user_id && s.is_active())
        {
            return Err(FunctionsError::AlreadySuspended);
        }

        let stored = Suspension {
            id: Uuid::new_v4(),
            user_id: suspension.user_id,
            admin_id: suspension.admin_id,
            reason: suspension.reason.clone(),
            is_permanent: suspension.term.is_permanent(),
            suspended_until: suspension.term.until(),
            lifted_at: None,
            lifted_by: None,
            created_at: Utc::now(),
        };
        tables.suspensions.push(stored.clone());
        tables.set_profile_status(suspension.user_id, ProfileStatus::Suspended);
        Ok(stored)
    }

    async fn lift_suspensions(
        &self,
        user: UserId,
        lifted_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, FunctionsError> {
        let mut tables = self.tables.lock().await;
        let mut lifted = 0;
        for suspension in tables
            .suspensions
            .iter_mut()
            .filter(|s| s.user_id == user && s.is_active())
        {
            suspension.lifted_at = Some(at);
            suspension.lifted_by = Some(lifted_by);
            lifted += 1;
        }
        if tables
            .profiles
            .get(&user)
            .is_some_and(|p| !p.status.is_terminal())
        {
            tables.set_profile_status(user, ProfileStatus::Active);
        }
        Ok(lifted)
    }

    async fn delete_user(&self, user: UserId, mode: DeletionMode) -> Result<u64, FunctionsError> {
        let mut tables = self.tables.lock().await;
        let owner = *user.as_uuid();

        if let Some(profile) = tables.profiles.get_mut(&user) {
            profile.status = ProfileStatus::Deleted;
            if mode == DeletionMode::Anonymize {
                profile.full_name = Some(DELETED_USER_NAME.to_string());
                profile.phone = None;
            }
        }

        let affected = match mode {
            DeletionMode::Anonymize => {
                let deleted = PropertyStatus::Deleted.as_str();
                let mut affected = 0;
                for property in tables
                    .properties
                    .iter_mut()
                    .filter(|p| p.user_id == owner && p.status.as_deref() != Some(deleted))
                {
                    property.status = Some(deleted.to_string());
                    affected += 1;
                }
                affected
            }
            DeletionMode::Purge => {
                let before = tables.properties.len();
                tables.properties.retain(|p| p.user_id != owner);
                u64::try_from(before - tables.properties.len()).unwrap_or(u64::MAX)
            }
        };
        Ok(affected)
    }

    async fn find_property(
        &self,
        property: PropertyId,
    ) -> Result<Option<PropertySummary>, FunctionsError> {
        Ok(self
            .tables
            .lock()
            .await
            .properties
            .iter()
            .find(|p| p.id == *property.as_uuid())
            .map(|p| PropertySummary {
                id: p.id,
                user_id: p.user_id,
                title: p.title.clone(),
            }))
    }

    async fn set_property_status(
        &self,
        property: PropertyId,
        status: PropertyStatus,
    ) -> Result<bool, FunctionsError> {
        let mut tables = self.tables.lock().await;
        let Some(row) = tables
            .properties
            .iter_mut()
            .find(|p| p.id == *property.as_uuid())
        else {
            return Ok(false);
        };
        row.status = Some(status.as_str().to_string());
        Ok(true)
    }

    async fn delete_property(&self, property: PropertyId) -> Result<bool, FunctionsError> {
        let mut tables = self.tables.lock().await;
        let before = tables.properties.len();
        tables.properties.retain(|p| p.id != *property.as_uuid());
        Ok(tables.properties.len() < before)
    }

    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<(), FunctionsError> {
        let mut tables = self.tables.lock().await;
        if tables.fail_audit {
            return Err(FunctionsError::Persistence(
                "audit log unavailable".to_string(),
            ));
        }
        tables.audit.push(entry.clone());
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileRow>, FunctionsError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<ProfileRow> = tables.profiles.values().map(to_profile_row).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list_properties(&self) -> Result<Vec<PropertyRow>, FunctionsError> {
        let mut rows = self.tables.lock().await.properties.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list_point_balances(&self) -> Result<Vec<PointBalanceRow>, FunctionsError> {
        Ok(self
            .tables
            .lock()
            .await
            .balances
            .iter()
            .map(|(user, points)| PointBalanceRow {
                user_id: *user.as_uuid(),
                points: *points,
            })
            .collect())
    }

    async fn recent_transactions(&self, limit: u32) -> Result<Vec<TransactionRow>, FunctionsError> {
        let tables = self.tables.lock().await;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(tables.ledger.iter().rev().take(limit).cloned().collect())
    }

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionRow>, FunctionsError> {
        Ok(self.tables.lock().await.subscriptions.clone())
    }

    async fn list_verifications(&self) -> Result<Vec<VerificationRow>, FunctionsError> {
        Ok(self.tables.lock().await.verifications.clone())
    }

    async fn count_reviews(&self) -> Result<u64, FunctionsError> {
        Ok(self.tables.lock().await.reviews)
    }

    async fn count_favorites(&self) -> Result<u64, FunctionsError> {
        Ok(self.tables.lock().await.favorites)
    }
}

#[async_trait]
impl UserScopedStore for MemoryStore {
    async fn find_own_profile(
        &self,
        caller: &Identity,
    ) -> Result<Option<ProfileRecord>, FunctionsError> {
        Ok(self.tables.lock().await.profiles.get(&caller.id).cloned())
    }

    async fn insert_own_profile(
        &self,
        caller: &Identity,
        profile: &NewProfile,
    ) -> Result<ProfileRecord, FunctionsError> {
        let mut tables = self.tables.lock().await;
        if tables.profiles.contains_key(&caller.id) {
            return Err(FunctionsError::ProfileExists);
        }
        let record = ProfileRecord {
            user_id: caller.id,
            full_name: Some(profile.full_name.clone()),
            phone: profile.phone.clone(),
            user_type: Some(profile.user_type.as_str().to_string()),
            status: ProfileStatus::Active,
            created_at: Utc::now(),
        };
        tables.profiles.insert(caller.id, record.clone());
        Ok(record)
    }
}
