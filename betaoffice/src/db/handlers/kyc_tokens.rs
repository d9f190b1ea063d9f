//! Database repository for KYC onboarding tokens.

use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{
        errors::Result,
        models::kyc_tokens::{KycToken, KycTokenCreateDBRequest},
    },
    types::{TokenId, abbrev_uuid},
};

const TOKEN_COLUMNS: &str =
    "token, email, product_id, plan_name, checkout_session_id, created_at, expires_at, kyc_submitted, submitted_at";

pub struct KycTokens<'c> {
    db: &'c mut PgConnection,
}

impl<'c> KycTokens<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(token = %abbrev_uuid(&request.token)), err)]
    pub async fn create(&mut self, request: &KycTokenCreateDBRequest) -> Result<KycToken> {
        let token = sqlx::query_as::<_, KycToken>(&format!(
            r#"
            INSERT INTO kyc_tokens (token, email, product_id, plan_name, checkout_session_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TOKEN_COLUMNS}
            "#
        ))
        .bind(request.token)
        .bind(&request.email)
        .bind(request.product_id)
        .bind(&request.plan_name)
        .bind(&request.checkout_session_id)
        .bind(request.expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(token)
    }

    #[instrument(skip(self), fields(token = %abbrev_uuid(&token)), err)]
    pub async fn get_by_id(&mut self, token: TokenId) -> Result<Option<KycToken>> {
        let token = sqlx::query_as::<_, KycToken>(&format!("SELECT {TOKEN_COLUMNS} FROM kyc_tokens WHERE token = $1"))
            .bind(token)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(token)
    }

    /// Fetch a token and hold a row lock on it until the surrounding transaction ends.
    ///
    /// Concurrent submissions with the same token serialize here, so only one of them can
    /// observe the token as unsubmitted.
    #[instrument(skip(self), fields(token = %abbrev_uuid(&token)), err)]
    pub async fn get_for_update(&mut self, token: TokenId) -> Result<Option<KycToken>> {
        let token = sqlx::query_as::<_, KycToken>(&format!("SELECT {TOKEN_COLUMNS} FROM kyc_tokens WHERE token = $1 FOR UPDATE"))
            .bind(token)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(token)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_checkout_session(&mut self, checkout_session_id: &str) -> Result<Option<KycToken>> {
        let token = sqlx::query_as::<_, KycToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM kyc_tokens WHERE checkout_session_id = $1"
        ))
        .bind(checkout_session_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(token)
    }

    /// Delete every unsubmitted token for an email. Returns the number of tokens removed.
    #[instrument(skip(self, email), err)]
    pub async fn delete_unsubmitted_for_email(&mut self, email: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM kyc_tokens WHERE LOWER(email) = LOWER($1) AND NOT kyc_submitted")
            .bind(email)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// Consume a token. Returns false if it was already consumed.
    #[instrument(skip(self), fields(token = %abbrev_uuid(&token)), err)]
    pub async fn mark_submitted(&mut self, token: TokenId) -> Result<bool> {
        let result = sqlx::query("UPDATE kyc_tokens SET kyc_submitted = TRUE, submitted_at = NOW() WHERE token = $1 AND NOT kyc_submitted")
            .bind(token)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
