//! mikoi-functions server entry point.
//!
//! Loads the configuration, wires the stores and external clients, and
//! serves the functions router.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use mikoi_functions::api;
use mikoi_functions::app_state::{AppState, Backends};
use mikoi_functions::auth::SupabaseIdentityProvider;
use mikoi_functions::config::FunctionsConfig;
use mikoi_functions::gateway::{PaymentGateway, PaystackGateway};
use mikoi_functions::mailer::ResendMailer;
use mikoi_functions::persistence::{MemoryStore, PostgresStore, PrivilegedStore, UserScopedStore};
use mikoi_functions::rate_limit::InMemoryRateLimiter;

/// How often closed rate-limit windows are dropped.
const LIMITER_PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = FunctionsConfig::from_env().context("invalid LISTEN_ADDR")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(?config, "starting mikoi-functions");

    // Build persistence layer
    let (store, user_store): (Arc<dyn PrivilegedStore>, Arc<dyn UserScopedStore>) =
        if config.persistence_enabled {
            let postgres = PostgresStore::connect(&config)
                .await
                .context("failed to connect to the database")?;
            if config.run_migrations {
                postgres
                    .migrate()
                    .await
                    .context("failed to run migrations")?;
                tracing::info!("migrations applied");
            }
            let postgres = Arc::new(postgres);
            (
                Arc::clone(&postgres) as Arc<dyn PrivilegedStore>,
                postgres as Arc<dyn UserScopedStore>,
            )
        } else {
            tracing::warn!("persistence disabled, using the in-memory store");
            let memory = Arc::new(MemoryStore::with_admins(&config.bootstrap_admin_ids));
            (
                Arc::clone(&memory) as Arc<dyn PrivilegedStore>,
                memory as Arc<dyn UserScopedStore>,
            )
        };

    // Build external clients
    let timeout = config.http_client_timeout();
    let identity = SupabaseIdentityProvider::new(
        config.supabase_url.clone(),
        config.supabase_anon_key.clone(),
        timeout,
    )
    .context("failed to build the identity client")?;

    let gateway = match &config.paystack_secret_key {
        Some(key) => {
            let paystack = PaystackGateway::new(config.paystack_base_url.clone(), key.clone(), timeout)
                .context("failed to build the payment gateway client")?;
            Some(Arc::new(paystack) as Arc<dyn PaymentGateway>)
        }
        None => {
            tracing::warn!("PAYSTACK_SECRET_KEY not set, payment functions will answer 500");
            None
        }
    };

    let mailer = ResendMailer::new(
        config.resend_base_url.clone(),
        config.resend_api_key.clone(),
        config.email_from.clone(),
        timeout,
    )
    .context("failed to build the email client")?;

    let payment_limiter = Arc::new(InMemoryRateLimiter::per_hour(
        config.payment_rate_limit_per_hour,
    ));
    let points_limiter = Arc::new(InMemoryRateLimiter::per_hour(
        config.points_rate_limit_per_hour,
    ));
    spawn_limiter_purge(vec![
        Arc::clone(&payment_limiter),
        Arc::clone(&points_limiter),
    ]);

    let listen_addr = config.listen_addr;
    let app_state = AppState::new(
        config,
        Backends {
            identity: Arc::new(identity),
            store,
            user_store,
            gateway,
            mailer: Arc::new(mailer),
            payment_limiter,
            points_limiter,
        },
    );

    // Build router
    let app = api::build_router(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Drops closed windows so idle callers do not accumulate.
fn spawn_limiter_purge(limiters: Vec<Arc<InMemoryRateLimiter>>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            for limiter in &limiters {
                let purged = limiter.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "rate-limit windows purged");
                }
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
