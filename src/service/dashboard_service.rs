//! Admin dashboard aggregation.
//!
//! Eight independent reads run concurrently; everything after that is a
//! pure in-memory join in [`build_dashboard`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::FunctionsError;
use crate::persistence::{
    PointBalanceRow, PrivilegedStore, ProfileRow, PropertyRow, SubscriptionRow, TransactionRow,
    VerificationRow,
};

/// Ledger rows shown on the dashboard.
pub const RECENT_TRANSACTIONS: u32 = 50;

/// Number of cities in [`DashboardStats::top_cities`].
pub const TOP_CITIES: usize = 5;

/// Placeholder for rows whose owner has no profile or no name.
pub const UNKNOWN_USER: &str = "Inconnu";

/// Listing count of one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CityCount {
    /// City name.
    pub city: String,
    /// Listings in this city.
    pub count: u64,
}

/// Platform-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Profiles, any status.
    pub total_users: u64,
    /// Listings, any status.
    pub total_properties: u64,
    /// Listings with status `active`.
    pub active_properties: u64,
    /// Listings with status `reserved`.
    pub reserved_properties: u64,
    /// Sum of all point balances.
    pub total_points: i64,
    /// Active subscriptions to a paid plan.
    pub premium_users: u64,
    /// Verification requests awaiting review.
    pub pending_verifications: u64,
    /// Distinct listing cities.
    pub total_cities: u64,
    /// Favourite rows.
    pub total_favorites: u64,
    /// Review rows.
    pub total_reviews: u64,
    /// Monthly price sum of premium subscriptions.
    pub monthly_revenue: f64,
    /// Cities with the most listings, busiest first.
    pub top_cities: Vec<CityCount>,
}

/// A profile with its point balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardUser {
    /// User id.
    pub id: Uuid,
    /// Display name.
    pub full_name: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Account type.
    pub user_type: Option<String>,
    /// Lifecycle status.
    pub status: Option<String>,
    /// Point balance, 0 without a balance row.
    pub points: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A listing with its owner's name.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardProperty {
    /// Listing id.
    pub id: Uuid,
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
    /// Owner display name.
    pub owner_name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A ledger row with the beneficiary's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardTransaction {
    /// Row id.
    pub id: Uuid,
    /// Beneficiary display name.
    pub user_name: String,
    /// Point delta.
    pub amount: i64,
    /// Type tag.
    pub transaction_type: String,
    /// Description.
    pub description: Option<String>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

/// A pending verification with the applicant's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardVerification {
    /// Row id.
    pub id: Uuid,
    /// Applicant display name.
    pub user_name: String,
    /// Verification kind.
    pub verification_type: String,
    /// Always `pending`.
    pub status: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// Everything the admin dashboard page renders.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Counters.
    pub stats: DashboardStats,
    /// Profiles, newest first.
    pub users: Vec<DashboardUser>,
    /// Listings, newest first.
    pub properties: Vec<DashboardProperty>,
    /// Most recent ledger rows.
    pub transactions: Vec<DashboardTransaction>,
    /// Verification requests awaiting review.
    pub pending_verifications: Vec<DashboardVerification>,
}

/// Raw reads feeding [`build_dashboard`].
#[derive(Debug, Default)]
pub struct DashboardSources {
    /// Profiles, newest first.
    pub profiles: Vec<ProfileRow>,
    /// Listings, newest first.
    pub properties: Vec<PropertyRow>,
    /// Point balances.
    pub balances: Vec<PointBalanceRow>,
    /// Most recent ledger rows.
    pub transactions: Vec<TransactionRow>,
    /// Subscriptions with plan prices.
    pub subscriptions: Vec<SubscriptionRow>,
    /// Verification requests.
    pub verifications: Vec<VerificationRow>,
    /// Review count.
    pub reviews: u64,
    /// Favourite count.
    pub favorites: u64,
}

/// Read-only aggregation over the privileged store.
#[derive(Debug)]
pub struct DashboardService {
    store: Arc<dyn PrivilegedStore>,
}

impl DashboardService {
    /// Creates a new `DashboardService`.
    #[must_use]
    pub fn new(store: Arc<dyn PrivilegedStore>) -> Self {
        Self { store }
    }

    /// Loads and joins the dashboard data.
    ///
    /// # Errors
    ///
    /// Returns the first persistence error among the concurrent reads.
    pub async fn load(&self) -> Result<Dashboard, FunctionsError> {
        let store = &self.store;
        let (
            profiles,
            properties,
            balances,
            transactions,
            subscriptions,
            verifications,
            reviews,
            favorites,
        ) = tokio::try_join!(
            store.list_profiles(),
            store.list_properties(),
            store.list_point_balances(),
            store.recent_transactions(RECENT_TRANSACTIONS),
            store.list_subscriptions(),
            store.list_verifications(),
            store.count_reviews(),
            store.count_favorites(),
        )?;

        let dashboard = build_dashboard(DashboardSources {
            profiles,
            properties,
            balances,
            transactions,
            subscriptions,
            verifications,
            reviews,
            favorites,
        });
        tracing::debug!(
            users = dashboard.stats.total_users,
            properties = dashboard.stats.total_properties,
            "dashboard loaded"
        );
        Ok(dashboard)
    }
}

fn count<T>(items: &[T], pred: impl Fn(&T) -> bool) -> u64 {
    u64::try_from(items.iter().filter(|item| pred(item)).count()).unwrap_or(u64::MAX)
}

fn len_u64<T>(items: &[T]) -> u64 {
    u64::try_from(items.len()).unwrap_or(u64::MAX)
}

/// Joins the raw reads into the dashboard view.
#[must_use]
pub fn build_dashboard(sources: DashboardSources) -> Dashboard {
    let DashboardSources {
        profiles,
        properties,
        balances,
        transactions,
        subscriptions,
        verifications,
        reviews,
        favorites,
    } = sources;

    let names: HashMap<Uuid, &str> = profiles
        .iter()
        .filter_map(|p| p.full_name.as_deref().map(|name| (p.user_id, name)))
        .filter(|(_, name)| !name.is_empty())
        .collect();
    let name_of = |user: &Uuid| names.get(user).copied().unwrap_or(UNKNOWN_USER).to_string();
    let points: HashMap<Uuid, i64> = balances.iter().map(|b| (b.user_id, b.points)).collect();

    let premium: Vec<&SubscriptionRow> = subscriptions.iter().filter(|s| s.is_premium()).collect();
    let monthly_revenue = premium.iter().filter_map(|s| s.price_monthly).sum();

    // First-seen order breaks ties between cities with equal counts.
    let mut cities: Vec<CityCount> = Vec::new();
    for property in &properties {
        match cities.iter_mut().find(|c| c.city == property.city) {
            Some(entry) => entry.count += 1,
            None => cities.push(CityCount {
                city: property.city.clone(),
                count: 1,
            }),
        }
    }
    let total_cities = len_u64(&cities);
    cities.sort_by(|a, b| b.count.cmp(&a.count));
    cities.truncate(TOP_CITIES);

    let pending: Vec<&VerificationRow> = verifications
        .iter()
        .filter(|v| v.status == "pending")
        .collect();

    let stats = DashboardStats {
        total_users: len_u64(&profiles),
        total_properties: len_u64(&properties),
        active_properties: count(&properties, |p| p.status.as_deref() == Some("active")),
        reserved_properties: count(&properties, |p| p.status.as_deref() == Some("reserved")),
        total_points: balances
            .iter()
            .fold(0_i64, |total, b| total.saturating_add(b.points)),
        premium_users: len_u64(&premium),
        pending_verifications: len_u64(&pending),
        total_cities,
        total_favorites: favorites,
        total_reviews: reviews,
        monthly_revenue,
        top_cities: cities,
    };

    let users = profiles
        .iter()
        .map(|p| DashboardUser {
            id: p.user_id,
            full_name: p.full_name.clone(),
            phone: p.phone.clone(),
            user_type: p.user_type.clone(),
            status: p.status.clone(),
            points: points.get(&p.user_id).copied().unwrap_or(0),
            created_at: p.created_at,
        })
        .collect();

    let properties_view = properties
        .iter()
        .map(|p| DashboardProperty {
            id: p.id,
            title: p.title.clone(),
            price: p.price,
            city: p.city.clone(),
            status: p.status.clone(),
            listing_type: p.listing_type.clone(),
            property_type: p.property_type.clone(),
            owner_name: name_of(&p.user_id),
            created_at: p.created_at,
        })
        .collect();

    let transactions_view = transactions
        .iter()
        .map(|t| DashboardTransaction {
            id: t.id,
            user_name: name_of(&t.user_id),
            amount: t.amount,
            transaction_type: t.transaction_type.clone(),
            description: t.description.clone(),
            created_at: t.created_at,
        })
        .collect();

    let pending_view = pending
        .iter()
        .map(|v| DashboardVerification {
            id: v.id,
            user_name: name_of(&v.user_id),
            verification_type: v.verification_type.clone(),
            status: v.status.clone(),
            created_at: v.created_at,
        })
        .collect();

    Dashboard {
        stats,
        users,
        properties: properties_view,
        transactions: transactions_view,
        pending_verifications: pending_view,
    }
}
