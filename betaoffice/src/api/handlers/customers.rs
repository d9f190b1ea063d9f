//! Customer-facing lookups: onboarding record by email and scanned mail by subscription.

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use crate::{
    AppState,
    api::models::{
        mail::{MailQuery, ScannedMailResponse},
        subscriptions::{CustomerQuery, CustomerResponse},
    },
    db::{
        handlers::{Repository, ScannedMails, Subscriptions},
        models::scanned_mails::ScannedMailFilter,
    },
    errors::{Error, Result},
};

/// Find the subscription a customer email belongs to.
#[utoipa::path(
    get,
    path = "/customer",
    tag = "customers",
    summary = "Look up customer",
    description = "Return the external id of the subscription registered for an email address. Matching is case-insensitive.",
    params(CustomerQuery),
    responses(
        (status = 200, description = "Customer found", body = CustomerResponse),
        (status = 404, description = "Customer not found"),
    )
)]
#[instrument(skip_all)]
pub async fn get_customer(State(state): State<AppState>, Query(query): Query<CustomerQuery>) -> Result<Json<CustomerResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let subscription = Subscriptions::new(&mut conn)
        .get_by_email(query.email.trim())
        .await?
        .ok_or_else(|| Error::NotFound {
            message: "Customer not found".to_string(),
        })?;

    Ok(Json(CustomerResponse {
        external_id: subscription.external_id,
    }))
}

/// Scanned mail for a subscription, newest first.
#[utoipa::path(
    get,
    path = "/api/mail",
    tag = "customers",
    summary = "List scanned mail",
    params(MailQuery),
    responses(
        (status = 200, description = "Scanned mail", body = [ScannedMailResponse]),
    )
)]
#[instrument(skip_all, fields(external_id = %query.external_id))]
pub async fn list_mail(State(state): State<AppState>, Query(query): Query<MailQuery>) -> Result<Json<Vec<ScannedMailResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mails = ScannedMails::new(&mut conn)
        .list(&ScannedMailFilter {
            external_id: Some(query.external_id.trim().to_string()),
            skip: query.skip.unwrap_or(0).max(0),
            limit: query.limit.unwrap_or(50).clamp(1, 200),
        })
        .await?;

    Ok(Json(mails.into_iter().map(Into::into).collect()))
}
