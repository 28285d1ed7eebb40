//! Domain layer: identifiers, value objects and moderation rules.
//!
//! Types here are validated on construction; the service layer never
//! handles raw request strings.

pub mod identity;
pub mod ids;
pub mod moderation;
pub mod payment;
pub mod profile;
pub mod status;

pub use identity::{Identity, Role};
pub use ids::{PropertyId, UserId};
pub use moderation::{
    AuditAction, DeletionMode, ModerationPolicy, NewAuditEntry, NewSuspension, NewWarning,
    PROPERTY_ENTITY_TYPE, PropertyAction, PropertyActionKind, Suspension, SuspensionTerm,
    UserAction, Warning,
};
pub use payment::{
    CreditOutcome, PaymentAmount, PaymentReference, PointsCredit, PointsGrant, PointsPackage,
};
pub use profile::{NewProfile, ProfileRecord, UserType};
pub use status::{ProfileStatus, PropertyStatus};
