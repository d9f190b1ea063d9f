//! API request and response models for KYC tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{db::models::kyc_tokens::KycToken, types::TokenId};

/// Manually issue a KYC token, e.g. for a customer who paid outside the checkout.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TokenCreate {
    pub email: String,
    pub product_id: i32,
    pub plan_name: String,
}

/// A freshly issued token and the link that was emailed to the customer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenCreateResponse {
    #[schema(value_type = String, format = "uuid")]
    pub token: TokenId,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct RecoverTokenQuery {
    pub token: String,
}

/// What a live token was issued for, used to prefill the onboarding form.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecoverTokenResponse {
    pub email: String,
    pub product_id: i32,
    pub plan_name: String,
    pub expires_at: DateTime<Utc>,
}

impl From<KycToken> for RecoverTokenResponse {
    fn from(token: KycToken) -> Self {
        Self {
            email: token.email,
            product_id: token.product_id,
            plan_name: token.plan_name,
            expires_at: token.expires_at,
        }
    }
}
