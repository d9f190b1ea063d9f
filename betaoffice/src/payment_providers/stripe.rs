//! Stripe checkout provider implementation

use async_trait::async_trait;
use axum::http::HeaderMap;
use stripe::{CheckoutSession, CheckoutSessionPaymentStatus, Client, EventObject, EventType};

use crate::{
    config::StripeConfig,
    payment_providers::{CheckoutProvider, CompletedCheckout, PaymentError, Result},
};

/// Stripe checkout provider
pub struct StripeProvider {
    api_key: String,
    webhook_secret: String,
}

impl From<&StripeConfig> for StripeProvider {
    fn from(config: &StripeConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }
}

impl StripeProvider {
    /// Get a Stripe client
    fn client(&self) -> Client {
        Client::new(&self.api_key)
    }

    /// Fetch the session again with its line items, which webhook payloads do not carry.
    async fn completed_checkout(&self, session_id: &stripe::CheckoutSessionId) -> Result<Option<CompletedCheckout>> {
        let session = CheckoutSession::retrieve(&self.client(), session_id, &["line_items"])
            .await
            .map_err(|e| {
                tracing::error!("Failed to retrieve Stripe checkout session: {:?}", e);
                PaymentError::ProviderApi(e.to_string())
            })?;

        if !is_paid(&session.payment_status) {
            tracing::debug!("Checkout session {} is not paid yet, skipping", session.id);
            return Ok(None);
        }

        let email = session
            .customer_details
            .as_ref()
            .and_then(|details| details.email.clone())
            .or_else(|| session.customer_email.clone())
            .ok_or_else(|| {
                tracing::error!("Checkout session {} has no customer email", session.id);
                PaymentError::InvalidData("Missing customer email".to_string())
            })?;

        let price_id = session
            .line_items
            .as_ref()
            .and_then(|items| items.data.first())
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.to_string())
            .ok_or_else(|| {
                tracing::error!("Checkout session {} has no priced line items", session.id);
                PaymentError::InvalidData("Missing line item price".to_string())
            })?;

        Ok(Some(CompletedCheckout {
            session_id: session.id.to_string(),
            email,
            price_id,
        }))
    }
}

fn is_paid(status: &CheckoutSessionPaymentStatus) -> bool {
    matches!(status, CheckoutSessionPaymentStatus::Paid | CheckoutSessionPaymentStatus::NoPaymentRequired)
}

fn completes_checkout(event_type: &EventType) -> bool {
    matches!(event_type, EventType::CheckoutSessionCompleted | EventType::CheckoutSessionAsyncPaymentSucceeded)
}

#[async_trait]
impl CheckoutProvider for StripeProvider {
    async fn validate_webhook(&self, headers: &HeaderMap, body: &str) -> Result<Option<CompletedCheckout>> {
        let signature = headers
            .get("stripe-signature")
            .ok_or_else(|| {
                tracing::error!("Missing stripe-signature header");
                PaymentError::InvalidData("Missing stripe-signature header".to_string())
            })?
            .to_str()
            .map_err(|e| {
                tracing::error!("Invalid stripe-signature header: {:?}", e);
                PaymentError::InvalidData("Invalid stripe-signature header".to_string())
            })?;

        let event = stripe::Webhook::construct_event(body, signature, &self.webhook_secret).map_err(|e| {
            tracing::error!("Failed to construct webhook event: {:?}", e);
            PaymentError::InvalidData(format!("Webhook validation failed: {}", e))
        })?;

        tracing::trace!("Validated Stripe webhook event: {:?}", event.type_);

        if !completes_checkout(&event.type_) {
            tracing::debug!("Ignoring webhook event type: {:?}", event.type_);
            return Ok(None);
        }

        let session_id = match &event.data.object {
            EventObject::CheckoutSession(session) => session.id.clone(),
            _ => {
                tracing::error!("Checkout event {:?} without a checkout session", event.type_);
                return Err(PaymentError::InvalidData("Missing checkout session in webhook event".to_string()));
            }
        };

        self.completed_checkout(&session_id).await
    }
}
