//! Admin review API. Every handler requires [`AdminUser`] credentials.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use futures::future::join_all;
use tracing::{info, instrument, warn};

use crate::{
    AppState,
    api::models::subscriptions::{
        CancelResponse, ListSubmissionsQuery, ReviewRequest, SubmissionDetail, SubmissionStatusResponse, SubmissionSummary,
    },
    auth::AdminUser,
    db::{
        handlers::{CompanyMembers, MemberDocuments, Repository, Subscriptions},
        models::subscriptions::{PartnerStatus, ReviewStatus, Subscription, SubscriptionFilter},
    },
    errors::{Error, Result},
    kyc::forwarding::{ForwardOutcome, forward_subscription},
    partner::{PartnerApi, UNKNOWN_STATUS},
};

fn not_found(external_id: &str) -> Error {
    Error::NotFound {
        message: format!("Subscription {external_id} not found"),
    }
}

async fn partner_status_of(partner: &dyn PartnerApi, subscription: &Subscription) -> String {
    if subscription.partner_status != PartnerStatus::Forwarded {
        return UNKNOWN_STATUS.to_string();
    }

    match partner.subscription_status(&subscription.external_id).await {
        Ok(status) => status,
        Err(e) => {
            warn!(external_id = %subscription.external_id, error = %e, "Could not fetch partner subscription status");
            UNKNOWN_STATUS.to_string()
        }
    }
}

/// List submissions, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/submissions",
    tag = "admin",
    summary = "List submissions",
    description = "List stored submissions with their review and partner state. For forwarded submissions the live partner \
status is fetched; it is `UNKNOWN` when the partner cannot be reached or the submission has not been forwarded.",
    params(ListSubmissionsQuery),
    responses(
        (status = 200, description = "Submissions", body = [SubmissionSummary]),
        (status = 401, description = "Missing admin credentials"),
        (status = 403, description = "Invalid admin credentials"),
    ),
    security(("BasicAuth" = []))
)]
#[instrument(skip_all)]
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<ListSubmissionsQuery>,
    _admin: AdminUser,
) -> Result<Json<Vec<SubmissionSummary>>> {
    let subscriptions = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Subscriptions::new(&mut conn)
            .list(&SubscriptionFilter {
                review_status: query.review_status,
                partner_status: query.partner_status,
                skip: query.skip(),
                limit: query.limit(),
            })
            .await?
    };

    let statuses = join_all(subscriptions.iter().map(|s| partner_status_of(state.partner.as_ref(), s))).await;

    Ok(Json(
        subscriptions
            .into_iter()
            .zip(statuses)
            .map(|(subscription, status)| SubmissionSummary::new(subscription, status))
            .collect(),
    ))
}

/// Full details of one submission.
#[utoipa::path(
    get,
    path = "/api/admin/submission/{external_id}",
    tag = "admin",
    summary = "Get submission",
    description = "Return a submission with its owners and the metadata of their uploaded documents.",
    params(("external_id" = String, Path, description = "Subscription external id")),
    responses(
        (status = 200, description = "Submission", body = SubmissionDetail),
        (status = 401, description = "Missing admin credentials"),
        (status = 403, description = "Invalid admin credentials"),
        (status = 404, description = "Subscription not found"),
    ),
    security(("BasicAuth" = []))
)]
#[instrument(skip(state, _admin))]
pub async fn get_submission(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    _admin: AdminUser,
) -> Result<Json<SubmissionDetail>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let subscription = Subscriptions::new(&mut conn)
        .get_by_id(external_id.clone())
        .await?
        .ok_or_else(|| not_found(&external_id))?;
    let members = CompanyMembers::new(&mut conn).list(&external_id).await?;
    let member_ids: Vec<_> = members.iter().map(|m| m.id).collect();
    let documents = MemberDocuments::new(&mut conn).list_for_members(&member_ids).await?;

    Ok(Json(SubmissionDetail::new(subscription, members, documents)))
}

/// Approve or reject a pending submission.
#[utoipa::path(
    post,
    path = "/api/admin/review-submission",
    tag = "admin",
    summary = "Review submission",
    description = "Record an admin decision. Only submissions pending review accept a decision.",
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Decision recorded", body = SubmissionStatusResponse),
        (status = 400, description = "Invalid review status"),
        (status = 401, description = "Missing admin credentials"),
        (status = 403, description = "Invalid admin credentials"),
        (status = 404, description = "Subscription not found"),
        (status = 409, description = "Submission has already been reviewed"),
    ),
    security(("BasicAuth" = []))
)]
#[instrument(skip_all, fields(external_id = %request.external_id, review_status = request.review_status.as_str()))]
pub async fn review_submission(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<SubmissionStatusResponse>> {
    if request.review_status == ReviewStatus::PendingReview {
        return Err(Error::BadRequest {
            message: "review_status must be APPROVED or REJECTED".to_string(),
        });
    }

    let reason = request.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subscriptions::new(&mut conn);

    match repo.review(&request.external_id, request.review_status, reason).await? {
        Some(subscription) => {
            info!(admin = %admin.username, "Reviewed submission");
            Ok(Json(subscription.into()))
        }
        None => match repo.get_by_id(request.external_id.clone()).await? {
            None => Err(not_found(&request.external_id)),
            Some(existing) => Err(Error::Conflict {
                message: format!(
                    "Submission {} has already been reviewed ({})",
                    request.external_id,
                    existing.review_status.as_str()
                ),
            }),
        },
    }
}

/// Retry sending a submission to the partner.
#[utoipa::path(
    post,
    path = "/api/admin/submission/{external_id}/forward",
    tag = "admin",
    summary = "Forward submission",
    description = "Send a pending or failed submission to the partner API. Rejected submissions are never sent.",
    params(("external_id" = String, Path, description = "Subscription external id")),
    responses(
        (status = 200, description = "Forwarded", body = SubmissionStatusResponse),
        (status = 401, description = "Missing admin credentials"),
        (status = 403, description = "Invalid admin credentials"),
        (status = 404, description = "Subscription not found"),
        (status = 409, description = "Rejected, already forwarded or being forwarded"),
        (status = 502, description = "Partner API rejected the submission"),
    ),
    security(("BasicAuth" = []))
)]
#[instrument(skip(state, admin), fields(admin = %admin.username))]
pub async fn forward_submission(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    admin: AdminUser,
) -> Result<Json<SubmissionStatusResponse>> {
    match forward_subscription(&state.db, state.partner.as_ref(), &external_id).await? {
        ForwardOutcome::Forwarded(subscription) => Ok(Json(subscription.into())),
        ForwardOutcome::Failed { error, .. } => Err(Error::BadGateway {
            message: format!("Partner API rejected subscription {external_id}: {error}"),
        }),
    }
}

/// Ask the partner to stop a subscription at the end of its term.
#[utoipa::path(
    post,
    path = "/api/admin/submission/{external_id}/cancel",
    tag = "admin",
    summary = "Cancel subscription",
    description = "Request that the partner stops a forwarded subscription at the end of its current term.",
    params(("external_id" = String, Path, description = "Subscription external id")),
    responses(
        (status = 200, description = "Stop requested", body = CancelResponse),
        (status = 401, description = "Missing admin credentials"),
        (status = 403, description = "Invalid admin credentials"),
        (status = 404, description = "Subscription not found"),
        (status = 409, description = "Subscription was never forwarded"),
        (status = 502, description = "Partner API error"),
    ),
    security(("BasicAuth" = []))
)]
#[instrument(skip(state, admin), fields(admin = %admin.username))]
pub async fn cancel_submission(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    admin: AdminUser,
) -> Result<Json<CancelResponse>> {
    let subscription = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Subscriptions::new(&mut conn)
            .get_by_id(external_id.clone())
            .await?
            .ok_or_else(|| not_found(&external_id))?
    };

    if subscription.partner_status != PartnerStatus::Forwarded {
        return Err(Error::Conflict {
            message: format!("Subscription {external_id} has not been forwarded to the partner"),
        });
    }

    state.partner.stop_subscription(&external_id).await.map_err(|e| Error::BadGateway {
        message: format!("Partner API could not stop subscription {external_id}: {e}"),
    })?;

    info!("Requested end-of-term stop for subscription {}", external_id);

    Ok(Json(CancelResponse {
        external_id,
        message: "Subscription will stop at the end of the current term".to_string(),
    }))
}
