//! Checkout provider abstraction layer
//!
//! A checkout provider turns an inbound payment webhook into a [`CompletedCheckout`]: who paid
//! and for which price. Mapping the price to a partner product and issuing the KYC token happens
//! in [`crate::kyc::tokens`], so providers stay free of onboarding logic.

use async_trait::async_trait;
use axum::http::HeaderMap;
use std::sync::Arc;

use crate::config::PaymentConfig;

pub mod dummy;
pub mod stripe;

/// Create a checkout provider from configuration
///
/// This is the single point where we convert config into provider instances.
/// Adding a new provider requires adding a match arm here.
pub fn create_provider(config: &PaymentConfig) -> Arc<dyn CheckoutProvider> {
    match config {
        PaymentConfig::Stripe(stripe_config) => Arc::new(stripe::StripeProvider::from(stripe_config)),
        PaymentConfig::Dummy(_) => Arc::new(dummy::DummyProvider),
    }
}

/// Result type for checkout provider operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur while validating checkout webhooks
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider API error: {0}")]
    ProviderApi(String),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),
}

/// A paid checkout, as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    /// Provider session id, used to make token issuance idempotent
    pub session_id: String,
    /// Email the customer entered at checkout
    pub email: String,
    /// Price purchased, looked up in the configured plans
    pub price_id: String,
}

/// Abstract checkout provider interface
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Validate and interpret a webhook delivery.
    ///
    /// Returns `Ok(None)` for events that do not complete a checkout (other event types, or a
    /// session that has not been paid yet). Returns `Err` if the delivery cannot be trusted or
    /// parsed (invalid signature, malformed body).
    async fn validate_webhook(&self, headers: &HeaderMap, body: &str) -> Result<Option<CompletedCheckout>>;
}
