//! Dummy checkout provider implementation
//!
//! Accepts unsigned JSON bodies of the form `{"session_id", "email", "price_id"}`. Useful for
//! local development and tests, where no real checkout is available.

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Deserialize;

use crate::payment_providers::{CheckoutProvider, CompletedCheckout, PaymentError, Result};

pub struct DummyProvider;

#[derive(Debug, Deserialize)]
struct DummyEvent {
    session_id: String,
    email: String,
    price_id: String,
}

#[async_trait]
impl CheckoutProvider for DummyProvider {
    async fn validate_webhook(&self, _headers: &HeaderMap, body: &str) -> Result<Option<CompletedCheckout>> {
        let event: DummyEvent = serde_json::from_str(body).map_err(|e| PaymentError::InvalidData(format!("Invalid dummy checkout event: {e}")))?;

        if event.email.trim().is_empty() {
            return Err(PaymentError::InvalidData("Dummy checkout event has no email".to_string()));
        }

        tracing::info!("Dummy provider accepted checkout session {}", event.session_id);

        Ok(Some(CompletedCheckout {
            session_id: event.session_id,
            email: event.email.trim().to_string(),
            price_id: event.price_id,
        }))
    }
}
