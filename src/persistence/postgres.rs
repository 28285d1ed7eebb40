//! PostgreSQL implementation of both store capabilities.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::models::{
    PointBalanceRow, ProfileRow, PropertyRow, PropertySummary, SubscriptionRow, TransactionRow,
    VerificationRow,
};
use super::{DELETED_USER_NAME, PrivilegedStore, UserScopedStore};
use crate::config::FunctionsConfig;
use crate::domain::{
    CreditOutcome, DeletionMode, Identity, NewAuditEntry, NewProfile, NewSuspension, NewWarning,
    PaymentReference, PointsCredit, ProfileRecord, ProfileStatus, PropertyId, PropertyStatus,
    Role, Suspension, UserId, Warning,
};
use crate::error::FunctionsError;

type SuspensionTuple = (
    Uuid,
    Uuid,
    Uuid,
    String,
    bool,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<Uuid>,
    DateTime<Utc>,
);

type ProfileTuple = (
    Uuid,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
);

const PROFILE_COLUMNS: &str = "user_id, full_name, phone, user_type, status, created_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
///
/// The pool connects with service-role credentials. Caller-scoped
/// operations switch to the `authenticated` role inside a transaction and
/// publish the caller's claims, so row-level policies apply to them.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn db_err(e: sqlx::Error) -> FunctionsError {
    FunctionsError::Persistence(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

fn suspension_from_row(row: SuspensionTuple) -> Suspension {
    let (id, user_id, admin_id, reason, is_permanent, suspended_until, lifted_at, lifted_by, created_at) =
        row;
    Suspension {
        id,
        user_id: UserId::from_uuid(user_id),
        admin_id: UserId::from_uuid(admin_id),
        reason,
        is_permanent,
        suspended_until,
        lifted_at,
        lifted_by: lifted_by.map(UserId::from_uuid),
        created_at,
    }
}

fn profile_from_row(row: ProfileTuple) -> Result<ProfileRecord, FunctionsError> {
    let (user_id, full_name, phone, user_type, status, created_at) = row;
    let status = match status.as_deref() {
        None => ProfileStatus::Active,
        Some(raw) => raw.parse().map_err(FunctionsError::Persistence)?,
    };
    Ok(ProfileRecord {
        user_id: UserId::from_uuid(user_id),
        full_name,
        phone,
        user_type,
        status,
        created_at,
    })
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the pool settings from `config`.
    ///
    /// # Errors
    ///
    /// Returns the connection error if the database is unreachable.
    pub async fn connect(config: &FunctionsConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled migrations.
    ///
    /// # Errors
    ///
    /// Returns the migration error, leaving already-applied steps in place.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Opens a transaction running as the caller.
    async fn scoped(&self, caller: &Identity) -> Result<Transaction<'_, Postgres>, FunctionsError> {
        let claims = serde_json::json!({
            "sub": caller.id,
            "role": "authenticated",
            "email": caller.email,
        });

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("SELECT set_config('request.jwt.claims', $1, true)")
            .bind(claims.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("SET LOCAL ROLE authenticated")
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        Ok(tx)
    }
}

#[async_trait]
impl PrivilegedStore for PostgresStore {
    async fn has_role(&self, user: UserId, role: Role) -> Result<bool, FunctionsError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role::text = $2)",
        )
        .bind(*user.as_uuid())
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn payment_reference_exists(
        &self,
        reference: &PaymentReference,
    ) -> Result<bool, FunctionsError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM points_transactions WHERE payment_reference = $1)",
        )
        .bind(reference.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn credit_points(&self, credit: &PointsCredit) -> Result<CreditOutcome, FunctionsError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let inserted = sqlx::query(
            "INSERT INTO points_transactions \
             (user_id, amount, transaction_type, description, payment_reference) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (payment_reference) DO NOTHING",
        )
        .bind(*credit.user_id.as_uuid())
        .bind(i64::from(credit.points))
        .bind(&credit.transaction_type)
        .bind(&credit.description)
        .bind(credit.reference.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            return Ok(CreditOutcome::AlreadyProcessed);
        }

        let new_total = sqlx::query_scalar::<_, i64>(
            "INSERT INTO user_points (user_id, points) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE \
             SET points = user_points.points + EXCLUDED.points, updated_at = now() \
             RETURNING points::int8",
        )
        .bind(*credit.user_id.as_uuid())
        .bind(i64::from(credit.points))
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(CreditOutcome::Credited { new_total })
    }

    async fn find_profile(&self, user: UserId) -> Result<Option<ProfileRecord>, FunctionsError> {
        let row = sqlx::query_as::<_, ProfileTuple>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(*user.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(profile_from_row).transpose()
    }

    async fn insert_warning(&self, warning: &NewWarning) -> Result<Warning, FunctionsError> {
        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "INSERT INTO user_warnings (user_id, admin_id, reason) VALUES ($1, $2, $3) \
             RETURNING id, created_at",
        )
        .bind(*warning.user_id.as_uuid())
        .bind(*warning.admin_id.as_uuid())
        .bind(&warning.reason)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Warning {
            id,
            user_id: warning.user_id,
            admin_id: warning.admin_id,
            reason: warning.reason.clone(),
            created_at,
        })
    }

    async fn count_warnings(&self, user: UserId) -> Result<u64, FunctionsError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT count(*) FROM user_warnings WHERE user_id = $1")
                .bind(*user.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(count_to_u64(count))
    }

    async fn active_suspension(
        &self,
        user: UserId,
    ) -> Result<Option<Suspension>, FunctionsError> {
        let row = sqlx::query_as::<_, SuspensionTuple>(
            "SELECT id, user_id, admin_id, reason, is_permanent, suspended_until, \
             lifted_at, lifted_by, created_at \
             FROM user_suspensions WHERE user_id = $1 AND lifted_at IS NULL \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(*user.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(suspension_from_row))
    }

    async fn suspend_user(&self, suspension: &NewSuspension) -> Result<Suspension, FunctionsError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query_as::<_, SuspensionTuple>(
            "INSERT INTO user_suspensions \
             (user_id, admin_id, reason, is_permanent, suspended_until) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, admin_id, reason, is_permanent, suspended_until, \
             lifted_at, lifted_by, created_at",
        )
        .bind(*suspension.user_id.as_uuid())
        .bind(*suspension.admin_id.as_uuid())
        .bind(&suspension.reason)
        .bind(suspension.term.is_permanent())
        .bind(suspension.term.until())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                FunctionsError::AlreadySuspended
            } else {
                db_err(e)
            }
        })?;

        sqlx::query("UPDATE profiles SET status = $2, updated_at = now() WHERE user_id = $1")
            .bind(*suspension.user_id.as_uuid())
            .bind(ProfileStatus::Suspended.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(suspension_from_row(row))
    }

    async fn lift_suspensions(
        &self,
        user: UserId,
        lifted_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, FunctionsError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let lifted = sqlx::query(
            "UPDATE user_suspensions SET lifted_at = $2, lifted_by = $3 \
             WHERE user_id = $1 AND lifted_at IS NULL",
        )
        .bind(*user.as_uuid())
        .bind(at)
        .bind(*lifted_by.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?
        .rows_affected();

        sqlx::query(
            "UPDATE profiles SET status = $2, updated_at = now() \
             WHERE user_id = $1 AND status IS DISTINCT FROM $3",
        )
        .bind(*user.as_uuid())
        .bind(ProfileStatus::Active.as_str())
        .bind(ProfileStatus::Deleted.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(lifted)
    }

    async fn delete_user(&self, user: UserId, mode: DeletionMode) -> Result<u64, FunctionsError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let listings = match mode {
            DeletionMode::Anonymize => {
                sqlx::query(
                    "UPDATE profiles SET status = $2, full_name = $3, phone = NULL, \
                     updated_at = now() WHERE user_id = $1",
                )
                .bind(*user.as_uuid())
                .bind(ProfileStatus::Deleted.as_str())
                .bind(DELETED_USER_NAME)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;

                sqlx::query(
                    "UPDATE properties SET status = $2, updated_at = now() \
                     WHERE user_id = $1 AND status IS DISTINCT FROM $2",
                )
                .bind(*user.as_uuid())
                .bind(PropertyStatus::Deleted.as_str())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?
                .rows_affected()
            }
            DeletionMode::Purge => {
                sqlx::query(
                    "UPDATE profiles SET status = $2, updated_at = now() WHERE user_id = $1",
                )
                .bind(*user.as_uuid())
                .bind(ProfileStatus::Deleted.as_str())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;

                sqlx::query("DELETE FROM properties WHERE user_id = $1")
                    .bind(*user.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(db_err)?
                    .rows_affected()
            }
        };

        tx.commit().await.map_err(db_err)?;
        Ok(listings)
    }

    async fn find_property(
        &self,
        property: PropertyId,
    ) -> Result<Option<PropertySummary>, FunctionsError> {
        sqlx::query_as::<_, PropertySummary>(
            "SELECT id, user_id, title FROM properties WHERE id = $1",
        )
        .bind(*property.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn set_property_status(
        &self,
        property: PropertyId,
        status: PropertyStatus,
    ) -> Result<bool, FunctionsError> {
        let result =
            sqlx::query("UPDATE properties SET status = $2, updated_at = now() WHERE id = $1")
                .bind(*property.as_uuid())
                .bind(status.as_str())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_property(&self, property: PropertyId) -> Result<bool, FunctionsError> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(*property.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<(), FunctionsError> {
        sqlx::query(
            "INSERT INTO admin_audit_logs \
             (admin_id, action, target_user_id, target_entity_type, target_entity_id, details) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(*entry.admin_id.as_uuid())
        .bind(entry.action.as_str())
        .bind(entry.target_user_id.map(Uuid::from))
        .bind(entry.target_entity_type)
        .bind(entry.target_entity_id)
        .bind(&entry.details)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileRow>, FunctionsError> {
        sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn list_properties(&self) -> Result<Vec<PropertyRow>, FunctionsError> {
        sqlx::query_as::<_, PropertyRow>(
            "SELECT id, user_id, title, price::float8 AS price, city, status, listing_type, \
             property_type, created_at FROM properties ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn list_point_balances(&self) -> Result<Vec<PointBalanceRow>, FunctionsError> {
        sqlx::query_as::<_, PointBalanceRow>(
            "SELECT user_id, points::int8 AS points FROM user_points",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn recent_transactions(&self, limit: u32) -> Result<Vec<TransactionRow>, FunctionsError> {
        sqlx::query_as::<_, TransactionRow>(
            "SELECT id, user_id, amount::int8 AS amount, transaction_type, description, \
             payment_reference, created_at \
             FROM points_transactions ORDER BY created_at DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn list_subscriptions(&self) -> Result<Vec<SubscriptionRow>, FunctionsError> {
        sqlx::query_as::<_, SubscriptionRow>(
            "SELECT s.user_id, s.status, p.name AS plan_name, \
             p.price_monthly::float8 AS price_monthly \
             FROM user_subscriptions s LEFT JOIN subscription_plans p ON p.id = s.plan_id \
             ORDER BY s.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn list_verifications(&self) -> Result<Vec<VerificationRow>, FunctionsError> {
        sqlx::query_as::<_, VerificationRow>(
            "SELECT id, user_id, verification_type, status, created_at \
             FROM user_verifications ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn count_reviews(&self) -> Result<u64, FunctionsError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM reviews")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count_to_u64(count))
    }

    async fn count_favorites(&self) -> Result<u64, FunctionsError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM favorites")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count_to_u64(count))
    }
}

#[async_trait]
impl UserScopedStore for PostgresStore {
    async fn find_own_profile(
        &self,
        caller: &Identity,
    ) -> Result<Option<ProfileRecord>, FunctionsError> {
        let mut tx = self.scoped(caller).await?;
        let row = sqlx::query_as::<_, ProfileTuple>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(*caller.id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        row.map(profile_from_row).transpose()
    }

    async fn insert_own_profile(
        &self,
        caller: &Identity,
        profile: &NewProfile,
    ) -> Result<ProfileRecord, FunctionsError> {
        let mut tx = self.scoped(caller).await?;
        let row = sqlx::query_as::<_, ProfileTuple>(&format!(
            "INSERT INTO profiles (user_id, full_name, phone, user_type) \
             VALUES ($1, $2, $3, $4) RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(*caller.id.as_uuid())
        .bind(&profile.full_name)
        .bind(&profile.phone)
        .bind(profile.user_type.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                FunctionsError::ProfileExists
            } else {
                db_err(e)
            }
        })?;
        tx.commit().await.map_err(db_err)?;

        profile_from_row(row)
    }
}
