//! Database models for subscriptions (company onboarding records).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::TokenId;

/// Admin review state of a subscription.
///
/// `PendingReview` is the only state that accepts a review; approved and rejected are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    PendingReview,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::PendingReview => "PENDING_REVIEW",
            ReviewStatus::Approved => "APPROVED",
            ReviewStatus::Rejected => "REJECTED",
        }
    }
}

/// Synchronisation state with the partner API, tracked independently of the review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartnerStatus {
    /// Saved locally, not yet sent
    Pending,
    /// Claimed by a forwarder; the partner call is in progress
    InFlight,
    Forwarded,
    /// Last attempt failed; `partner_error` holds the reason
    Failed,
}

/// Database entity model
#[derive(Debug, Clone, FromRow)]
pub struct Subscription {
    pub external_id: String,
    pub product_id: i32,
    pub kyc_token: Option<TokenId>,
    pub customer_email: String,
    pub customer_first_name: String,
    pub customer_middle_name: Option<String>,
    pub customer_last_name: String,
    pub company_name: String,
    pub trading_name: Option<String>,
    pub organisation_type: String,
    pub limited_company_number: Option<String>,
    pub telephone_number: Option<String>,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub postcode: String,
    pub country: String,
    pub start_date: NaiveDate,
    pub review_status: ReviewStatus,
    pub review_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub partner_status: PartnerStatus,
    pub partner_error: Option<String>,
    pub forwarded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for creating a subscription
#[derive(Debug, Clone)]
pub struct SubscriptionCreateDBRequest {
    pub external_id: String,
    pub product_id: i32,
    pub kyc_token: Option<TokenId>,
    pub customer_email: String,
    pub customer_first_name: String,
    pub customer_middle_name: Option<String>,
    pub customer_last_name: String,
    pub company_name: String,
    pub trading_name: Option<String>,
    pub organisation_type: String,
    pub limited_company_number: Option<String>,
    pub telephone_number: Option<String>,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub postcode: String,
    pub country: String,
    pub start_date: NaiveDate,
}

/// Filter for listing subscriptions
#[derive(Debug, Clone)]
pub struct SubscriptionFilter {
    pub review_status: Option<ReviewStatus>,
    pub partner_status: Option<PartnerStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self {
            review_status: None,
            partner_status: None,
            skip: 0,
            limit: 100,
        }
    }
}
