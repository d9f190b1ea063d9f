//! HTTP handlers for KYC token issuance and recovery.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use tracing::instrument;

use crate::{
    AppState,
    api::models::tokens::{RecoverTokenQuery, RecoverTokenResponse, TokenCreate, TokenCreateResponse},
    auth::AdminUser,
    config::PlanConfig,
    errors::{Error, Result},
    kyc::tokens::{issue_token, recover_token as recover},
};

/// Issue a KYC token manually.
#[utoipa::path(
    post,
    path = "/api/create-token",
    tag = "tokens",
    summary = "Create KYC token",
    description = "Issue a KYC token for a customer and email them the onboarding link. Any unsubmitted token for the same email is replaced.",
    request_body = TokenCreate,
    responses(
        (status = 201, description = "Token issued", body = TokenCreateResponse),
        (status = 400, description = "Invalid email or plan"),
        (status = 401, description = "Missing admin credentials"),
        (status = 403, description = "Invalid admin credentials"),
    ),
    security(("BasicAuth" = []))
)]
#[instrument(skip_all)]
pub async fn create_token(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<TokenCreate>,
) -> Result<(StatusCode, Json<TokenCreateResponse>)> {
    if request.product_id <= 0 || request.plan_name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "product_id and plan_name are required".to_string(),
        });
    }

    let plan = PlanConfig {
        product_id: request.product_id,
        plan_name: request.plan_name.trim().to_string(),
    };
    let issued = issue_token(&state, &request.email, &plan, None).await?;

    Ok((
        StatusCode::CREATED,
        Json(TokenCreateResponse {
            token: issued.token.token,
            link: issued.link,
            expires_at: issued.token.expires_at,
        }),
    ))
}

/// Look up what a token was issued for.
#[utoipa::path(
    get,
    path = "/api/recover-token",
    tag = "tokens",
    summary = "Recover KYC token",
    description = "Return the email and plan of a live token, so the onboarding form can be prefilled.",
    params(RecoverTokenQuery),
    responses(
        (status = 200, description = "Token is usable", body = RecoverTokenResponse),
        (status = 404, description = "Invalid KYC token"),
        (status = 409, description = "Token already used"),
        (status = 410, description = "Token expired"),
    )
)]
#[instrument(skip_all)]
pub async fn recover_token(State(state): State<AppState>, Query(query): Query<RecoverTokenQuery>) -> Result<Json<RecoverTokenResponse>> {
    let token = recover(&state.db, &query.token, Utc::now()).await?;
    Ok(Json(token.into()))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::tokens::{RecoverTokenResponse, TokenCreateResponse},
        email::KYC_LINK_SUBJECT,
        test_utils::{admin_auth_header, basic_auth_header, create_test_app, create_test_app_with, create_test_config, insert_token},
    };
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_token_requires_admin(pool: PgPool) {
        let (server, _) = create_test_app(pool);
        let body = json!({ "email": "owner@acme.test", "product_id": 2736, "plan_name": "Virtual Office" });

        let response = server.post("/api/create-token").json(&body).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("www-authenticate").is_some());

        let (name, value) = basic_auth_header("admin", "wrong");
        let response = server.post("/api/create-token").add_header(&name, &value).json(&body).await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_token_sends_link(pool: PgPool) {
        let emails = tempfile::tempdir().unwrap();
        let mut config = create_test_config();
        config.email.transport = crate::config::EmailTransportConfig::File {
            path: emails.path().to_string_lossy().to_string(),
        };
        let (server, _) = create_test_app_with(pool, config, Default::default());
        let (name, value) = admin_auth_header();

        let response = server
            .post("/api/create-token")
            .add_header(&name, &value)
            .json(&json!({ "email": "owner@acme.test", "product_id": 2736, "plan_name": "Virtual Office" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let created: TokenCreateResponse = response.json();
        assert_eq!(created.link, format!("https://onboarding.test/kyc?token={}", created.token));

        let written: Vec<_> = std::fs::read_dir(emails.path()).unwrap().collect();
        assert_eq!(written.len(), 1);
        let email = std::fs::read_to_string(written[0].as_ref().unwrap().path()).unwrap();
        assert!(email.contains(KYC_LINK_SUBJECT));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_recover_token(pool: PgPool) {
        let live = insert_token(&pool, "live@acme.test", Utc::now() + Duration::days(1), false).await;
        let used = insert_token(&pool, "used@acme.test", Utc::now() + Duration::days(1), true).await;
        let expired = insert_token(&pool, "old@acme.test", Utc::now() - Duration::days(1), false).await;
        let (server, _) = create_test_app(pool);

        let response = server.get("/api/recover-token").add_query_param("token", live.token).await;
        response.assert_status_ok();
        let recovered: RecoverTokenResponse = response.json();
        assert_eq!(recovered.email, "live@acme.test");
        assert_eq!(recovered.plan_name, "Virtual Office");

        let response = server.get("/api/recover-token").add_query_param("token", used.token).await;
        response.assert_status(StatusCode::CONFLICT);
        response.assert_text("This KYC token has already been used.");

        let response = server.get("/api/recover-token").add_query_param("token", expired.token).await;
        response.assert_status(StatusCode::GONE);
        response.assert_text("This KYC token has expired.");

        let response = server.get("/api/recover-token").add_query_param("token", "nope").await;
        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_text("Invalid KYC token");
    }
}
