//! Listing moderation: suspend, reactivate or delete a property.

use std::sync::Arc;

use serde_json::json;

use crate::domain::{
    Identity, NewAuditEntry, PROPERTY_ENTITY_TYPE, PropertyAction, PropertyActionKind,
    PropertyStatus, UserId,
};
use crate::error::{EntityKind, FunctionsError};
use crate::persistence::PrivilegedStore;

/// Orchestrates admin actions on listings.
#[derive(Debug)]
pub struct ListingService {
    store: Arc<dyn PrivilegedStore>,
}

impl ListingService {
    /// Creates a new `ListingService`.
    #[must_use]
    pub fn new(store: Arc<dyn PrivilegedStore>) -> Self {
        Self { store }
    }

    /// Applies `action` and returns the confirmation message.
    ///
    /// The listing's title and owner are loaded first so the audit entry
    /// keeps them even after a delete.
    ///
    /// # Errors
    ///
    /// - [`FunctionsError::NotFound`] when the listing does not exist
    /// - persistence errors
    pub async fn apply(
        &self,
        admin: &Identity,
        action: &PropertyAction,
    ) -> Result<&'static str, FunctionsError> {
        let listing = self
            .store
            .find_property(action.property_id)
            .await?
            .ok_or(FunctionsError::NotFound(EntityKind::Property))?;

        let (applied, message) = match action.kind {
            PropertyActionKind::Suspend => (
                self.store
                    .set_property_status(action.property_id, PropertyStatus::Suspended)
                    .await?,
                "Annonce suspendue",
            ),
            PropertyActionKind::Activate => (
                self.store
                    .set_property_status(action.property_id, PropertyStatus::Active)
                    .await?,
                "Annonce réactivée",
            ),
            PropertyActionKind::Delete => (
                self.store.delete_property(action.property_id).await?,
                "Annonce supprimée",
            ),
        };
        // Deleted between the lookup and the write.
        if !applied {
            return Err(FunctionsError::NotFound(EntityKind::Property));
        }

        let entry = NewAuditEntry {
            admin_id: admin.id,
            action: action.kind.audit_action(),
            target_user_id: Some(UserId::from_uuid(listing.user_id)),
            target_entity_type: Some(PROPERTY_ENTITY_TYPE),
            target_entity_id: Some(listing.id),
            details: json!({
                "reason": action.reason,
                "property_title": listing.title,
            }),
        };
        if let Err(e) = self.store.append_audit(&entry).await {
            tracing::warn!(
                admin_id = %admin.id,
                property_id = %listing.id,
                error = %e,
                "failed to write audit entry"
            );
        }

        tracing::info!(
            admin_id = %admin.id,
            property_id = %listing.id,
            action = entry.action.as_str(),
            "listing action applied"
        );
        Ok(message)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{AuditAction, PropertyId};
    use crate::persistence::MemoryStore;

    fn action(property_id: PropertyId, kind: PropertyActionKind) -> PropertyAction {
        PropertyAction {
            property_id,
            kind,
            reason: Some("contenu trompeur".to_string()),
        }
    }

    #[tokio::test]
    async fn suspend_then_activate_updates_status_and_audits() {
        let store = Arc::new(MemoryStore::new());
        let owner = UserId::new();
        let admin = Identity::new(UserId::new(), None);
        let listing = store
            .seed_property(owner, "Duplex Riviera", "Abidjan", PropertyStatus::Active)
            .await;
        let service = ListingService::new(Arc::clone(&store) as Arc<dyn PrivilegedStore>);

        let Ok(message) = service
            .apply(&admin, &action(listing, PropertyActionKind::Suspend))
            .await
        else {
            panic!("suspend should succeed");
        };
        assert_eq!(message, "Annonce suspendue");
        assert_eq!(store.property_status(listing).await.as_deref(), Some("suspended"));

        assert!(
            service
                .apply(&admin, &action(listing, PropertyActionKind::Activate))
                .await
                .is_ok()
        );
        assert_eq!(store.property_status(listing).await.as_deref(), Some("active"));

        let audit = store.audit_log().await;
        assert_eq!(audit.len(), 2);
        let Some(first) = audit.first() else {
            panic!("audit entry expected");
        };
        assert_eq!(first.action, AuditAction::PropertySuspension);
        assert_eq!(first.target_user_id, Some(owner));
        assert_eq!(first.target_entity_type, Some("property"));
        assert_eq!(first.details["property_title"], "Duplex Riviera");
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_the_listing_action() {
        let store = Arc::new(MemoryStore::new());
        let listing = store
            .seed_property(UserId::new(), "Villa Cocody", "Abidjan", PropertyStatus::Active)
            .await;
        store.fail_audit_writes(true).await;
        let service = ListingService::new(Arc::clone(&store) as Arc<dyn PrivilegedStore>);

        let result = service
            .apply(
                &Identity::new(UserId::new(), None),
                &action(listing, PropertyActionKind::Suspend),
            )
            .await;
        assert!(matches!(result, Ok("Annonce suspendue")));
        assert_eq!(store.property_status(listing).await.as_deref(), Some("suspended"));
        assert!(store.audit_log().await.is_empty());
    }

    #[tokio::test]
    async fn delete_keeps_title_in_audit() {
        let store = Arc::new(MemoryStore::new());
        let owner = UserId::new();
        let listing = store
            .seed_property(owner, "Terrain Bingerville", "Bingerville", PropertyStatus::Active)
            .await;
        let service = ListingService::new(Arc::clone(&store) as Arc<dyn PrivilegedStore>);

        let Ok(message) = service
            .apply(
                &Identity::new(UserId::new(), None),
                &action(listing, PropertyActionKind::Delete),
            )
            .await
        else {
            panic!("delete should succeed");
        };
        assert_eq!(message, "Annonce supprimée");
        assert_eq!(store.property_count(owner).await, 0);

        let audit = store.audit_log().await;
        assert!(audit.iter().any(|e| e.action == AuditAction::PropertyDeletion
            && e.details["property_title"] == "Terrain Bingerville"));
    }

    #[tokio::test]
    async fn unknown_listing_is_not_found_and_not_audited() {
        let store = Arc::new(MemoryStore::new());
        let service = ListingService::new(Arc::clone(&store) as Arc<dyn PrivilegedStore>);
        assert!(matches!(
            service
                .apply(
                    &Identity::new(UserId::new(), None),
                    &action(PropertyId::new(), PropertyActionKind::Suspend),
                )
                .await,
            Err(FunctionsError::NotFound(EntityKind::Property))
        ));
        assert!(store.audit_log().await.is_empty());
    }
}
