//! # mikoi-functions
//!
//! Privileged HTTP functions of the MikoiCI real-estate marketplace:
//! payment initialization, idempotent points crediting, admin moderation
//! with an audit trail, the admin dashboard and self-service registration.
//!
//! Browser clients call these functions with their own bearer token. The
//! token is verified against the identity provider on every call; admin
//! functions additionally check the `admin` role through the service-role
//! store, never through the caller's own credentials.
//!
//! ## Architecture
//!
//! ```text
//! Clients (browser, payment gateway redirect)
//!     │
//!     ├── Handlers + extractors (api/, auth/)
//!     │
//!     ├── Services (service/)
//!     │     ├── RateLimiter (rate_limit)
//!     │     ├── PaymentGateway (gateway/)
//!     │     └── Mailer (mailer/)
//!     │
//!     └── PrivilegedStore / UserScopedStore (persistence/)
//!           ├── PostgreSQL
//!           └── in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod mailer;
pub mod persistence;
pub mod rate_limit;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
