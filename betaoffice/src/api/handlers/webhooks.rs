//! Inbound webhooks: paid checkouts and scanned-mail notifications.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::{info, instrument, warn};

use crate::{
    AppState,
    api::models::mail::{ScannedMailAccepted, ScannedMailWebhook},
    db::{
        handlers::{Repository, ScannedMails, Subscriptions},
        models::scanned_mails::ScannedMailCreateDBRequest,
    },
    errors::{Error, Result},
    kyc::tokens::issue_for_checkout,
    payment_providers::PaymentError,
};

/// Checkout webhook. Issues a KYC token for each paid checkout of a configured plan.
#[utoipa::path(
    post,
    path = "/webhook/stripe",
    tag = "webhooks",
    summary = "Checkout webhook",
    description = "Receives checkout events from the payment provider. A completed, paid checkout for a configured price \
issues a KYC token and emails the onboarding link. Replayed events for the same checkout session do not issue a second token.",
    responses(
        (status = 200, description = "Event accepted"),
        (status = 400, description = "Invalid signature or payload"),
        (status = 501, description = "No payment provider configured"),
    )
)]
#[instrument(skip_all)]
pub async fn checkout_webhook(State(state): State<AppState>, headers: HeaderMap, body: String) -> StatusCode {
    let Some(provider) = state.checkout.as_ref() else {
        warn!("Checkout webhook called but no payment provider is configured");
        return StatusCode::NOT_IMPLEMENTED;
    };

    let checkout = match provider.validate_webhook(&headers, &body).await {
        Ok(Some(checkout)) => checkout,
        Ok(None) => return StatusCode::OK,
        Err(PaymentError::InvalidData(e)) => {
            warn!(error = %e, "Rejected checkout webhook");
            return StatusCode::BAD_REQUEST;
        }
        Err(e) => {
            warn!(error = %e, "Failed to process checkout webhook");
            // Provider retries the delivery
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    match issue_for_checkout(&state, &checkout).await {
        Ok(Some(issued)) if issued.newly_issued => {
            info!(session_id = %checkout.session_id, "Issued KYC token for checkout");
            StatusCode::OK
        }
        Ok(_) => StatusCode::OK,
        Err(Error::BadRequest { message }) => {
            // Retrying will not fix a bad email address
            warn!(session_id = %checkout.session_id, %message, "Checkout cannot be turned into a KYC token");
            StatusCode::OK
        }
        Err(e) => {
            warn!(session_id = %checkout.session_id, error = %e, "Failed to issue KYC token for checkout");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Scanned-mail notification from the mail-handling partner.
#[utoipa::path(
    post,
    path = "/api/webhook/scanned-mail",
    tag = "webhooks",
    summary = "Scanned mail webhook",
    description = "Records a scanned letter and emails the customer the subscription belongs to. Also served at `/webhook`.",
    request_body = ScannedMailWebhook,
    responses(
        (status = 200, description = "Notification stored", body = ScannedMailAccepted),
        (status = 400, description = "Missing external_id or a link that is not an http(s) URL"),
        (status = 404, description = "No subscription with this external_id"),
    )
)]
#[instrument(skip_all, fields(external_id = %payload.external_id.trim()))]
pub async fn scanned_mail_webhook(State(state): State<AppState>, Json(payload): Json<ScannedMailWebhook>) -> Result<Json<ScannedMailAccepted>> {
    if payload.external_id.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "external_id is required".to_string(),
        });
    }
    if let Some(url) = payload.invalid_link() {
        return Err(Error::BadRequest {
            message: format!("Invalid URL: {url}"),
        });
    }
    let request = ScannedMailCreateDBRequest::from(payload);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let subscription = Subscriptions::new(&mut conn).get_by_id(request.external_id.clone()).await?;
    if subscription.is_none() && state.config.mail_webhook.require_known_subscription {
        return Err(Error::NotFound {
            message: format!("No subscription found for external_id {}", request.external_id),
        });
    }

    let mail = ScannedMails::new(&mut conn).create(&request).await?;

    let Some(subscription) = subscription else {
        warn!(mail_id = mail.id, "Stored scanned mail for unknown subscription");
        return Ok(Json(ScannedMailAccepted {
            id: mail.id,
            external_id: mail.external_id,
            notified: false,
        }));
    };

    let notified = match state.email.send_scanned_mail_email(&subscription.customer_email, &mail).await {
        Ok(()) => ScannedMails::new(&mut conn).mark_notified(mail.id).await?,
        Err(e) => {
            warn!(mail_id = mail.id, error = %e, "Failed to send scanned mail notification");
            false
        }
    };

    info!(mail_id = mail.id, notified, "Recorded scanned mail");

    Ok(Json(ScannedMailAccepted {
        id: mail.id,
        external_id: mail.external_id,
        notified,
    }))
}
