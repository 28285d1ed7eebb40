//! Service layer: business logic orchestration.
//!
//! Each service owns `Arc`s of the store traits and external clients it
//! needs. Handlers only parse requests and shape responses.

pub mod dashboard_service;
pub mod listing_service;
pub mod moderation_service;
pub mod payment_service;
pub mod registration_service;

pub use dashboard_service::{Dashboard, DashboardService};
pub use listing_service::ListingService;
pub use moderation_service::{ModerationOutcome, ModerationService};
pub use payment_service::{CreditedPayment, PaymentService, PaymentSettings};
pub use registration_service::RegistrationService;
