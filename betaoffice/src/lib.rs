//! # betaoffice: KYC onboarding backend
//!
//! `betaoffice` collects Know-Your-Customer details from customers who bought a virtual-office
//! plan, stores them, and registers the subscription with the mail-handling partner (Hoxton). It
//! also relays the partner's scanned-mail notifications to customers by email.
//!
//! ## Overview
//!
//! A customer's journey through the service:
//!
//! 1. The customer pays at checkout. The payment provider calls `/webhook/stripe`, and a single-use
//!    **KYC token** is issued for the purchased plan and emailed as a link to the onboarding form.
//! 2. The form looks the token up (`/api/recover-token`) and posts the company, address and owner
//!    details, optionally with identity documents, to `/api/submit-kyc`.
//! 3. The submission is validated, stored and the token consumed in one transaction. The
//!    subscription is then forwarded to the partner API. If the partner fails, the data stays
//!    stored and an admin can retry.
//! 4. Admins review submissions over a Basic-Auth protected API (`/api/admin/*`).
//! 5. When the partner scans a letter it calls `/webhook`; the record is stored and the customer
//!    emailed.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for persistence.
//!
//! - The **API layer** ([`api`]) holds the handlers and wire models.
//! - The **workflow layer** ([`kyc`]) issues tokens, validates and stores submissions, and
//!   forwards them to the partner.
//! - The **database layer** ([`db`]) uses the repository pattern over borrowed connections, so
//!   callers choose the transaction boundary.
//! - External services sit behind traits: [`partner::PartnerApi`] for the partner and
//!   [`payment_providers::CheckoutProvider`] for checkout webhooks.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use betaoffice::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = betaoffice::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     betaoffice::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod errors;
pub mod kyc;
mod openapi;
pub mod partner;
pub mod payment_providers;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{config::CorsOrigin, email::EmailService, openapi::ApiDoc, partner::PartnerApi, payment_providers::CheckoutProvider};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Room for form fields on top of the uploaded documents.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Upper bound on documents per submission accepted by the body limit.
const MAX_DOCUMENTS_PER_SUBMISSION: usize = 8;

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .partner(partner)
///     .email(Arc::new(email))
///     .maybe_checkout(checkout)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Partner subscription API
    pub partner: Arc<dyn PartnerApi>,
    pub email: Arc<EmailService>,
    /// Checkout webhook validation; `None` when no payment provider is configured
    pub checkout: Option<Arc<dyn CheckoutProvider>>,
}

/// Get the betaoffice database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

#[instrument(skip_all)]
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(config.database.acquire_timeout)
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let submission_limit = state
        .config
        .kyc
        .max_document_size
        .saturating_mul(MAX_DOCUMENTS_PER_SUBMISSION)
        .saturating_add(FORM_OVERHEAD_BYTES);

    let api_routes = Router::new()
        .route("/create-token", post(api::handlers::tokens::create_token))
        .route("/recover-token", get(api::handlers::tokens::recover_token))
        .route(
            "/submit-kyc",
            post(api::handlers::kyc::submit_kyc).layer(DefaultBodyLimit::max(submission_limit)),
        )
        .route("/mail", get(api::handlers::customers::list_mail))
        .route("/webhook/scanned-mail", post(api::handlers::webhooks::scanned_mail_webhook))
        // Admin review (Basic-Auth, enforced by the AdminUser extractor)
        .route("/admin/submissions", get(api::handlers::admin::list_submissions))
        .route("/admin/submission/{external_id}", get(api::handlers::admin::get_submission))
        .route("/admin/review-submission", post(api::handlers::admin::review_submission))
        .route(
            "/admin/submission/{external_id}/forward",
            post(api::handlers::admin::forward_submission),
        )
        .route(
            "/admin/submission/{external_id}/cancel",
            post(api::handlers::admin::cancel_submission),
        );

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/customer", get(api::handlers::customers::get_customer))
        // Webhook routes (external services)
        .route("/webhook", post(api::handlers::webhooks::scanned_mail_webhook))
        .route("/webhook/stripe", post(api::handlers::webhooks::checkout_webhook))
        .nest("/api", api_routes)
        .with_state(state.clone())
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The HTTP server and the resources it owns.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations and builds the
///    partner, email and checkout clients
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, closes the pool and flushes telemetry
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting onboarding service on {}", config.bind_address());

        let pool = setup_database(&config).await?;

        let partner = partner::create_client(&config.partner)?;
        let email = EmailService::new(&config.email)?;
        let checkout = config.payment.as_ref().map(payment_providers::create_provider);
        if checkout.is_none() {
            info!("No payment provider configured, checkout webhooks are disabled");
        }

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .partner(partner)
            .email(Arc::new(email))
            .maybe_checkout(checkout)
            .build();

        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Onboarding service listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
