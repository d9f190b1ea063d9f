//! Database models for KYC onboarding tokens.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::TokenId;

/// Database entity model
#[derive(Debug, Clone, FromRow)]
pub struct KycToken {
    pub token: TokenId,
    pub email: String,
    pub product_id: i32,
    pub plan_name: String,
    pub checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub kyc_submitted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Where a token is in its lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Live,
    Submitted,
    Expired,
}

impl KycToken {
    /// A submitted token reports `Submitted` even after it has also expired.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.kyc_submitted {
            TokenState::Submitted
        } else if self.expires_at <= now {
            TokenState::Expired
        } else {
            TokenState::Live
        }
    }
}

/// Request for creating a KYC token
#[derive(Debug, Clone)]
pub struct KycTokenCreateDBRequest {
    pub token: TokenId,
    pub email: String,
    pub product_id: i32,
    pub plan_name: String,
    pub checkout_session_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}
