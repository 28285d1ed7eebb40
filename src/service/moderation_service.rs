//! Moderation service: warnings, suspensions and account deletion.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::domain::{
    DeletionMode, Identity, ModerationPolicy, NewAuditEntry, NewSuspension, NewWarning,
    Suspension, SuspensionTerm, UserAction, UserId, Warning,
};
use crate::error::{EntityKind, FunctionsError};
use crate::persistence::PrivilegedStore;

/// What an applied [`UserAction`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationOutcome {
    /// A warning was recorded.
    Warned {
        /// The stored warning.
        warning: Warning,
        /// Warnings issued to the target so far, this one included.
        warning_count: u64,
        /// Suspension created by the escalation rule, if triggered.
        auto_suspension: Option<Suspension>,
    },
    /// A suspension was created.
    Suspended {
        /// The stored suspension.
        suspension: Suspension,
    },
    /// Suspensions were lifted.
    Unsuspended {
        /// Number of rows lifted.
        lifted_count: u64,
    },
    /// The account was deleted.
    Deleted {
        /// Listings soft-deleted or removed.
        listings_affected: u64,
    },
}

/// Applies admin actions to user accounts.
///
/// Every action is checked against the guards (no self-target, existing
/// and non-deleted target) before anything is written, and leaves an audit
/// entry afterwards. Audit failures are logged, not returned.
#[derive(Debug)]
pub struct ModerationService {
    store: Arc<dyn PrivilegedStore>,
    policy: ModerationPolicy,
}

impl ModerationService {
    /// Creates a new `ModerationService`.
    #[must_use]
    pub fn new(store: Arc<dyn PrivilegedStore>, policy: ModerationPolicy) -> Self {
        Self { store, policy }
    }

    /// Applies `action` to `target` on behalf of `admin`.
    ///
    /// # Errors
    ///
    /// - [`FunctionsError::SelfTarget`] when `target` is the admin
    /// - [`FunctionsError::NotFound`] when the target has no profile
    /// - [`FunctionsError::UserDeleted`] when the target is deleted
    /// - [`FunctionsError::AlreadySuspended`] for a second suspension
    /// - persistence errors
    pub async fn apply(
        &self,
        admin: &Identity,
        target: UserId,
        action: UserAction,
    ) -> Result<ModerationOutcome, FunctionsError> {
        if target == admin.id {
            tracing::warn!(admin_id = %admin.id, "admin tried to moderate own account");
            return Err(FunctionsError::SelfTarget);
        }

        let profile = self
            .store
            .find_profile(target)
            .await?
            .ok_or(FunctionsError::NotFound(EntityKind::User))?;
        if profile.status.is_terminal() {
            return Err(FunctionsError::UserDeleted);
        }

        let audit_action = action.audit_action();
        let (outcome, details) = match action {
            UserAction::Warn { reason } => self.warn(admin.id, target, reason).await?,
            UserAction::Suspend { reason, term } => {
                self.suspend(admin.id, target, reason, term).await?
            }
            UserAction::Unsuspend { reason } => {
                let lifted_count = self.store.lift_suspensions(target, admin.id, Utc::now()).await?;
                (
                    ModerationOutcome::Unsuspended { lifted_count },
                    json!({ "reason": reason, "lifted_count": lifted_count }),
                )
            }
            UserAction::Delete { reason, mode } => {
                let listings_affected = self.store.delete_user(target, mode).await?;
                (
                    ModerationOutcome::Deleted { listings_affected },
                    json!({
                        "reason": reason,
                        "anonymized": mode == DeletionMode::Anonymize,
                        "listings_affected": listings_affected,
                    }),
                )
            }
        };

        self.audit(NewAuditEntry {
            admin_id: admin.id,
            action: audit_action,
            target_user_id: Some(target),
            target_entity_type: None,
            target_entity_id: None,
            details,
        })
        .await;

        tracing::info!(
            admin_id = %admin.id,
            target_user_id = %target,
            action = audit_action.as_str(),
            "moderation action applied"
        );
        Ok(outcome)
    }

    async fn warn(
        &self,
        admin: UserId,
        target: UserId,
        reason: String,
    ) -> Result<(ModerationOutcome, serde_json::Value), FunctionsError> {
        let warning = self
            .store
            .insert_warning(&NewWarning {
                user_id: target,
                admin_id: admin,
                reason,
            })
            .await?;
        let warning_count = self.store.count_warnings(target).await?;
        let already_suspended = self.store.active_suspension(target).await?.is_some();

        let auto_suspension = match self.policy.escalation(
            target,
            admin,
            warning_count,
            already_suspended,
            Utc::now(),
        ) {
            Some(escalation) => match self.store.suspend_user(&escalation).await {
                Ok(suspension) => {
                    tracing::info!(
                        target_user_id = %target,
                        warning_count,
                        "warning threshold reached, user auto-suspended"
                    );
                    Some(suspension)
                }
                // A concurrent suspension won the race; the target is suspended either way.
                Err(FunctionsError::AlreadySuspended) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

        let details = json!({
            "reason": warning.reason,
            "warning_count": warning_count,
            "auto_suspended": auto_suspension.is_some(),
        });
        Ok((
            ModerationOutcome::Warned {
                warning,
                warning_count,
                auto_suspension,
            },
            details,
        ))
    }

    async fn suspend(
        &self,
        admin: UserId,
        target: UserId,
        reason: String,
        term: SuspensionTerm,
    ) -> Result<(ModerationOutcome, serde_json::Value), FunctionsError> {
        if self.store.active_suspension(target).await?.is_some() {
            return Err(FunctionsError::AlreadySuspended);
        }
        let suspension = self
            .store
            .suspend_user(&NewSuspension {
                user_id: target,
                admin_id: admin,
                reason,
                term,
            })
            .await?;
        let details = json!({
            "reason": suspension.reason,
            "is_permanent": suspension.is_permanent,
            "suspended_until": suspension.suspended_until,
        });
        Ok((ModerationOutcome::Suspended { suspension }, details))
    }

    async fn audit(&self, entry: NewAuditEntry) {
        if let Err(e) = self.store.append_audit(&entry).await {
            tracing::warn!(
                admin_id = %entry.admin_id,
                action = entry.action.as_str(),
                error = %e,
                "failed to write audit entry"
            );
        }
    }
}
