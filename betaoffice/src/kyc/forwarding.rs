//! Forwarding stored subscriptions to the partner API.

use sqlx::PgPool;
use tracing::{error, info, instrument};

use crate::{
    db::{
        handlers::{CompanyMembers, Repository, Subscriptions},
        models::subscriptions::{PartnerStatus, ReviewStatus, Subscription},
    },
    errors::{Error, Result},
    partner::{PartnerApi, SubscriptionPayload},
};

/// An in-flight claim older than this is assumed abandoned and may be taken over.
pub const STALE_CLAIM_AFTER: chrono::Duration = chrono::Duration::minutes(5);

/// Result of a forwarding attempt that reached the partner.
#[derive(Debug)]
pub enum ForwardOutcome {
    Forwarded(Subscription),
    /// The partner call failed; the subscription is kept in `FAILED` state with the error
    Failed { subscription: Subscription, error: String },
}

impl ForwardOutcome {
    pub fn subscription(&self) -> &Subscription {
        match self {
            ForwardOutcome::Forwarded(subscription) => subscription,
            ForwardOutcome::Failed { subscription, .. } => subscription,
        }
    }
}

/// Send a stored subscription and its members to the partner.
///
/// The subscription is claimed first, so it is never sent twice concurrently and never again
/// once it has been forwarded. Returns [`Error::NotFound`] for unknown ids and [`Error::Conflict`]
/// when the subscription was rejected, is already forwarded or is being forwarded.
///
/// No database connection is held while the partner call is in progress.
#[instrument(skip(db, partner), err)]
pub async fn forward_subscription(db: &PgPool, partner: &dyn PartnerApi, external_id: &str) -> Result<ForwardOutcome> {
    let payload = {
        let mut conn = db.acquire().await.map_err(|e| Error::Database(e.into()))?;

        let claimed = Subscriptions::new(&mut conn).claim_for_forwarding(external_id, STALE_CLAIM_AFTER).await?;
        let Some(subscription) = claimed else {
            let existing = Subscriptions::new(&mut conn).get_by_id(external_id.to_string()).await?;
            return Err(match existing {
                None => Error::NotFound {
                    message: "Subscription not found".to_string(),
                },
                Some(s) if s.review_status == ReviewStatus::Rejected => Error::Conflict {
                    message: format!("Submission {external_id} was rejected"),
                },
                Some(s) if s.partner_status == PartnerStatus::Forwarded => Error::Conflict {
                    message: format!("Subscription {external_id} has already been forwarded"),
                },
                Some(_) => Error::Conflict {
                    message: format!("Subscription {external_id} is currently being forwarded"),
                },
            });
        };

        let members = CompanyMembers::new(&mut conn).list(&subscription.external_id).await?;
        SubscriptionPayload::from_records(&subscription, &members)
    };

    let result = partner.create_subscription(&payload).await;

    let mut conn = db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    match result {
        Ok(_) => {
            let subscription = Subscriptions::new(&mut conn).mark_forwarded(external_id).await?;
            info!("Forwarded subscription {} to partner", external_id);
            Ok(ForwardOutcome::Forwarded(subscription))
        }
        Err(e) => {
            let message = e.to_string();
            error!(external_id, error = %message, "Failed to forward subscription to partner");
            let subscription = Subscriptions::new(&mut conn).mark_forward_failed(external_id, &message).await?;
            Ok(ForwardOutcome::Failed {
                subscription,
                error: message,
            })
        }
    }
}
