use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

struct AdminSecurityAddon;

impl Modify for AdminSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BasicAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Basic)
                        .description(Some(
                            "Admin credentials from the `admin` section of the server configuration:\n\n\
                            ```\nAuthorization: Basic base64(username:password)\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&AdminSecurityAddon),
    paths(
        api::handlers::tokens::create_token,
        api::handlers::tokens::recover_token,
        api::handlers::kyc::submit_kyc,
        api::handlers::webhooks::checkout_webhook,
        api::handlers::webhooks::scanned_mail_webhook,
        api::handlers::customers::get_customer,
        api::handlers::customers::list_mail,
        api::handlers::admin::list_submissions,
        api::handlers::admin::get_submission,
        api::handlers::admin::review_submission,
        api::handlers::admin::forward_submission,
        api::handlers::admin::cancel_submission,
    ),
    components(
        schemas(
            api::models::tokens::TokenCreate,
            api::models::tokens::TokenCreateResponse,
            api::models::tokens::RecoverTokenResponse,
            api::models::kyc::KycSubmissionRequest,
            api::models::kyc::OwnerRequest,
            api::models::kyc::KycSubmissionResponse,
            api::models::mail::ScannedMailWebhook,
            api::models::mail::ScannedMailAccepted,
            api::models::mail::ScannedMailResponse,
            api::models::subscriptions::SubmissionSummary,
            api::models::subscriptions::SubmissionDetail,
            api::models::subscriptions::MemberResponse,
            api::models::subscriptions::DocumentResponse,
            api::models::subscriptions::ReviewRequest,
            api::models::subscriptions::SubmissionStatusResponse,
            api::models::subscriptions::CancelResponse,
            api::models::subscriptions::CustomerResponse,
            crate::db::models::subscriptions::ReviewStatus,
            crate::db::models::subscriptions::PartnerStatus,
            crate::db::models::member_documents::DocumentKind,
        )
    ),
    tags(
        (name = "tokens", description = "Issue KYC tokens and look up what a token was issued for.

A token is a single-use UUID tied to a customer email and a purchased plan. Issuing a new token for an email replaces any unsubmitted one."),
        (name = "kyc", description = "Submit the onboarding form.

A submission is validated, stored together with its owners and documents, and forwarded to the partner. The token is consumed in the same transaction that stores the submission."),
        (name = "webhooks", description = "Inbound notifications from the payment provider and the mail-scanning partner."),
        (name = "customers", description = "Lookups used by the customer dashboard."),
        (name = "admin", description = "Review submissions and manage their partner subscription. Requires admin Basic-Auth credentials."),
    ),
    info(
        title = "BetaOffice Onboarding API",
        version = "1.0.0",
        description = "KYC onboarding backend for BetaOffice virtual-office subscriptions.

## Errors

Errors are returned as plain text with a matching HTTP status code. Token errors use `404` for unknown tokens, `409` for tokens that were already used and `410` for expired ones.",
    ),
)]
pub struct ApiDoc;
