//! API request and response models for KYC submission.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::{member_documents::DocumentKind, subscriptions::PartnerStatus};

/// A KYC submission, as posted by the onboarding form.
///
/// Every field is optional at the type level so that missing values can be reported together
/// with a single "Missing required fields" message instead of a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct KycSubmissionRequest {
    /// Token from the onboarding link
    pub token: Option<String>,
    /// Partner product id. Taken from the token when omitted.
    pub product_id: Option<i32>,
    pub customer_email: Option<String>,
    pub customer_first_name: Option<String>,
    pub customer_middle_name: Option<String>,
    pub customer_last_name: Option<String>,
    pub company_name: Option<String>,
    /// Defaults to the company name when sent to the partner
    pub trading_name: Option<String>,
    /// e.g. `LIMITED_COMPANY`, `SOLE_TRADER`
    pub organisation_type: Option<String>,
    pub limited_company_number: Option<String>,
    pub phone_number: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    /// Country name or ISO code, normalised to ISO 3166-1 alpha-2
    pub country: Option<String>,
    /// Company owners (beneficial owners and directors), at least one
    pub members: Vec<OwnerRequest>,
}

/// One company owner in a [`KycSubmissionRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct OwnerRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    /// `YYYY-MM-DD`
    pub date_of_birth: Option<String>,
}

/// A document uploaded alongside a multipart submission.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Zero-based index into the submission's owners
    pub owner_index: usize,
    pub kind: DocumentKind,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

/// Response to an accepted KYC submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KycSubmissionResponse {
    pub message: String,
    pub external_id: String,
    /// Where the subscription stands with the partner after this request
    pub partner_status: PartnerStatus,
}
