//! KYC token issuance and recovery.

use chrono::{DateTime, Utc};
use lettre::Address;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    AppState,
    config::PlanConfig,
    db::{
        errors::DbError,
        handlers::KycTokens,
        models::kyc_tokens::{KycToken, KycTokenCreateDBRequest, TokenState},
    },
    errors::{Error, Result},
    payment_providers::CompletedCheckout,
    types::{TokenId, abbrev_uuid},
};

const CHECKOUT_SESSION_CONSTRAINT: &str = "kyc_tokens_checkout_session_id_key";

/// A token handed out to a customer.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: KycToken,
    pub link: String,
    /// False when a replayed checkout event resolved to a token issued earlier
    pub newly_issued: bool,
}

/// Onboarding link for a token: `{public_url}/kyc?token={token}`.
pub fn kyc_link(public_url: &str, token: TokenId) -> String {
    format!("{}/kyc?token={}", public_url.trim_end_matches('/'), token)
}

fn invalid_token() -> Error {
    Error::NotFound {
        message: "Invalid KYC token".to_string(),
    }
}

/// Reject tokens that can no longer be used. An already-submitted token is reported as such
/// even once it has also expired.
pub fn ensure_usable(token: &KycToken, now: DateTime<Utc>) -> Result<()> {
    match token.state_at(now) {
        TokenState::Live => Ok(()),
        TokenState::Submitted => Err(Error::Conflict {
            message: "This KYC token has already been used.".to_string(),
        }),
        TokenState::Expired => Err(Error::Gone {
            message: "This KYC token has expired.".to_string(),
        }),
    }
}

/// Issue a new token for `email`, replacing any unsubmitted one, and email the link.
///
/// With a `checkout_session_id` the call is idempotent: a session that already produced a token
/// returns that token without sending another email. Email delivery failures are logged and do
/// not fail issuance; the token can be resent with another call.
#[instrument(skip(state, email, plan), fields(product_id = plan.product_id), err)]
pub async fn issue_token(state: &AppState, email: &str, plan: &PlanConfig, checkout_session_id: Option<&str>) -> Result<IssuedToken> {
    let email = email.trim();
    if email.parse::<Address>().is_err() {
        return Err(Error::BadRequest {
            message: "Invalid email address".to_string(),
        });
    }

    if let Some(session_id) = checkout_session_id
        && let Some(existing) = existing_for_session(&state.db, session_id).await?
    {
        info!("Checkout session {} already issued token {}", session_id, abbrev_uuid(&existing.token));
        return Ok(IssuedToken {
            link: kyc_link(&state.config.public_url, existing.token),
            token: existing,
            newly_issued: false,
        });
    }

    let ttl = chrono::Duration::from_std(state.config.kyc.token_ttl).map_err(|e| Error::Internal {
        operation: format!("convert token ttl: {e}"),
    })?;

    let request = KycTokenCreateDBRequest {
        token: Uuid::new_v4(),
        email: email.to_string(),
        product_id: plan.product_id,
        plan_name: plan.plan_name.clone(),
        checkout_session_id: checkout_session_id.map(str::to_string),
        expires_at: Utc::now() + ttl,
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let replaced = KycTokens::new(&mut tx).delete_unsubmitted_for_email(email).await?;
    let created = KycTokens::new(&mut tx).create(&request).await;

    let token = match created {
        Ok(token) => token,
        Err(e) if e.is_unique_violation_of(CHECKOUT_SESSION_CONSTRAINT) => {
            // Another delivery of the same checkout event won the race
            drop(tx);
            let session_id = checkout_session_id.unwrap_or_default();
            let existing = existing_for_session(&state.db, session_id).await?.ok_or(DbError::NotFound)?;
            return Ok(IssuedToken {
                link: kyc_link(&state.config.public_url, existing.token),
                token: existing,
                newly_issued: false,
            });
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    if replaced > 0 {
        info!("Replaced {} unsubmitted token(s) for reissued email", replaced);
    }
    info!("Issued KYC token {}", abbrev_uuid(&token.token));

    let link = kyc_link(&state.config.public_url, token.token);
    if let Err(e) = state.email.send_kyc_link_email(email, &link, state.config.token_ttl_days()).await {
        warn!(token = %abbrev_uuid(&token.token), error = %e, "Failed to send KYC link email");
    }

    Ok(IssuedToken {
        token,
        link,
        newly_issued: true,
    })
}

async fn existing_for_session(db: &PgPool, session_id: &str) -> Result<Option<KycToken>> {
    let mut conn = db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Ok(KycTokens::new(&mut conn).get_by_checkout_session(session_id).await?)
}

/// Issue a token for a paid checkout. Returns `None` when the purchased price is not one of the
/// configured plans.
#[instrument(skip(state, checkout), fields(session_id = %checkout.session_id), err)]
pub async fn issue_for_checkout(state: &AppState, checkout: &CompletedCheckout) -> Result<Option<IssuedToken>> {
    let plan = state
        .config
        .payment
        .as_ref()
        .and_then(|payment| payment.plans().get(&checkout.price_id));

    let Some(plan) = plan else {
        warn!(price_id = %checkout.price_id, "Checkout for unrecognised price, no token issued");
        return Ok(None);
    };

    issue_token(state, &checkout.email, plan, Some(&checkout.session_id)).await.map(Some)
}

/// Look up a token for the onboarding form, failing if it cannot be used any more.
#[instrument(skip(db, token), err)]
pub async fn recover_token(db: &PgPool, token: &str, now: DateTime<Utc>) -> Result<KycToken> {
    let token: TokenId = token.trim().parse().map_err(|_| invalid_token())?;

    let mut conn = db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let token = KycTokens::new(&mut conn).get_by_id(token).await?.ok_or_else(invalid_token)?;

    ensure_usable(&token, now)?;
    Ok(token)
}

/// Lock a token for submission inside the caller's transaction and check it can be consumed.
pub async fn lock_usable(conn: &mut sqlx::PgConnection, token: TokenId, now: DateTime<Utc>) -> Result<KycToken> {
    let token = KycTokens::new(conn).get_for_update(token).await?.ok_or_else(invalid_token)?;
    ensure_usable(&token, now)?;
    Ok(token)
}
