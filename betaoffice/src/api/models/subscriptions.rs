//! API request and response models for subscriptions and the admin review workflow.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::{
    company_members::CompanyMember,
    member_documents::{DocumentKind, MemberDocument},
    subscriptions::{PartnerStatus, ReviewStatus, Subscription},
};

/// Filters for the admin submission listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListSubmissionsQuery {
    pub review_status: Option<ReviewStatus>,
    pub partner_status: Option<PartnerStatus>,
    /// Number of items to skip (default: 0)
    pub skip: Option<i64>,
    /// Maximum number of items to return (default: 50, max: 200)
    pub limit: Option<i64>,
}

impl ListSubmissionsQuery {
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }
}

/// A submission as shown in the admin listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionSummary {
    pub external_id: String,
    pub product_id: i32,
    pub customer_email: String,
    pub customer_name: String,
    pub company_name: String,
    pub country: String,
    pub review_status: ReviewStatus,
    pub partner_status: PartnerStatus,
    /// Live status reported by the partner API, `UNKNOWN` if it could not be fetched
    pub partner_subscription_status: String,
    pub created_at: DateTime<Utc>,
}

impl SubmissionSummary {
    pub fn new(subscription: Subscription, partner_subscription_status: String) -> Self {
        Self {
            customer_name: full_name(
                &subscription.customer_first_name,
                subscription.customer_middle_name.as_deref(),
                &subscription.customer_last_name,
            ),
            external_id: subscription.external_id,
            product_id: subscription.product_id,
            customer_email: subscription.customer_email,
            company_name: subscription.company_name,
            country: subscription.country,
            review_status: subscription.review_status,
            partner_status: subscription.partner_status,
            partner_subscription_status,
            created_at: subscription.created_at,
        }
    }
}

fn full_name(first: &str, middle: Option<&str>, last: &str) -> String {
    [Some(first), middle, Some(last)]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything stored for one submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionDetail {
    pub external_id: String,
    pub product_id: i32,
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
    pub members: Vec<MemberResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    pub position: i32,
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub date_of_birth: NaiveDate,
    pub documents: Vec<DocumentResponse>,
}

/// Metadata of an uploaded document. Contents are never returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub kind: DocumentKind,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub sha256: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<MemberDocument> for DocumentResponse {
    fn from(document: MemberDocument) -> Self {
        Self {
            kind: document.kind,
            filename: document.filename,
            content_type: document.content_type,
            size_bytes: document.size_bytes,
            sha256: document.sha256,
            uploaded_at: document.created_at,
        }
    }
}

impl SubmissionDetail {
    pub fn new(subscription: Subscription, members: Vec<CompanyMember>, mut documents: Vec<MemberDocument>) -> Self {
        let members = members
            .into_iter()
            .map(|member| {
                let (own, rest): (Vec<_>, Vec<_>) = documents.drain(..).partition(|d| d.member_id == member.id);
                documents = rest;
                MemberResponse {
                    position: member.position,
                    email: member.email,
                    first_name: member.first_name,
                    middle_name: member.middle_name,
                    last_name: member.last_name,
                    phone_number: member.phone_number,
                    date_of_birth: member.date_of_birth,
                    documents: own.into_iter().map(Into::into).collect(),
                }
            })
            .collect();

        Self {
            external_id: subscription.external_id,
            product_id: subscription.product_id,
            customer_email: subscription.customer_email,
            customer_first_name: subscription.customer_first_name,
            customer_middle_name: subscription.customer_middle_name,
            customer_last_name: subscription.customer_last_name,
            company_name: subscription.company_name,
            trading_name: subscription.trading_name,
            organisation_type: subscription.organisation_type,
            limited_company_number: subscription.limited_company_number,
            telephone_number: subscription.telephone_number,
            address_line_1: subscription.address_line_1,
            address_line_2: subscription.address_line_2,
            city: subscription.city,
            postcode: subscription.postcode,
            country: subscription.country,
            start_date: subscription.start_date,
            review_status: subscription.review_status,
            review_reason: subscription.review_reason,
            reviewed_at: subscription.reviewed_at,
            partner_status: subscription.partner_status,
            partner_error: subscription.partner_error,
            forwarded_at: subscription.forwarded_at,
            created_at: subscription.created_at,
            members,
        }
    }
}

/// An admin decision on a pending submission.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub external_id: String,
    /// `APPROVED` or `REJECTED`
    pub review_status: ReviewStatus,
    pub reason: Option<String>,
}

/// Result of a review or a partner sync action.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionStatusResponse {
    pub external_id: String,
    pub review_status: ReviewStatus,
    pub partner_status: PartnerStatus,
    pub partner_error: Option<String>,
}

impl From<Subscription> for SubmissionStatusResponse {
    fn from(subscription: Subscription) -> Self {
        Self {
            external_id: subscription.external_id,
            review_status: subscription.review_status,
            partner_status: subscription.partner_status,
            partner_error: subscription.partner_error,
        }
    }
}

/// Acknowledgement of a stop request sent to the partner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancelResponse {
    pub external_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct CustomerQuery {
    pub email: String,
}

/// The onboarding record a customer email belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub external_id: String,
}
