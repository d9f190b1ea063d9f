//! Partner (Hoxton) subscription API.
//!
//! The [`PartnerApi`] trait is the seam between the onboarding workflow and the remote service.
//! [`hoxton::HoxtonClient`] is the reqwest implementation; tests point it at a wiremock server.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::PartnerConfig;

pub mod hoxton;
pub mod payload;

pub use payload::SubscriptionPayload;

/// Status reported for a subscription when the partner cannot be asked.
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

/// Errors from calls to the partner API
#[derive(Debug, thiserror::Error)]
pub enum PartnerError {
    #[error("partner request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("partner returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid partner response: {0}")]
    InvalidResponse(String),

    #[error("invalid partner URL: {0}")]
    Url(#[from] url::ParseError),
}

#[async_trait]
pub trait PartnerApi: Send + Sync {
    /// Create the subscription on the partner side.
    async fn create_subscription(&self, payload: &SubscriptionPayload) -> Result<serde_json::Value, PartnerError>;

    /// Current partner-side status of a subscription, e.g. `ACTIVE`.
    async fn subscription_status(&self, external_id: &str) -> Result<String, PartnerError>;

    /// Request the subscription be stopped at the end of its current term.
    async fn stop_subscription(&self, external_id: &str) -> Result<(), PartnerError>;
}

/// Build the partner client from configuration
pub fn create_client(config: &PartnerConfig) -> Result<Arc<dyn PartnerApi>, PartnerError> {
    Ok(Arc::new(hoxton::HoxtonClient::new(config)?))
}
