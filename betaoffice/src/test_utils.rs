//! Test utilities shared by unit and integration tests.

use async_trait::async_trait;
use axum_test::TestServer;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, Once},
};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::kyc::{KycSubmissionRequest, OwnerRequest},
    config::{AdminConfig, Config, DummyConfig, EmailConfig, EmailTransportConfig, PartnerConfig, PaymentConfig, PlanConfig},
    db::{
        handlers::{CompanyMembers, KycTokens, Repository, Subscriptions},
        models::{
            company_members::{CompanyMember, CompanyMemberCreateDBRequest},
            kyc_tokens::{KycToken, KycTokenCreateDBRequest},
            subscriptions::{PartnerStatus, ReviewStatus, Subscription, SubscriptionCreateDBRequest},
        },
    },
    email::EmailService,
    partner::{PartnerApi, PartnerError, SubscriptionPayload},
};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "test-admin-password";
pub const TEST_PRICE_ID: &str = "price_virtual_office";
pub const TEST_PRODUCT_ID: i32 = 2736;

/// reqwest is built without a default crypto provider; install one once per test binary.
pub fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("betaoffice-test-emails-{}", std::process::id()));

    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        public_url: "https://onboarding.test".to_string(),
        partner: PartnerConfig {
            base_url: "http://127.0.0.1:9/api/v2".to_string(),
            api_key: "hx_test".to_string(),
            ..Default::default()
        },
        admin: AdminConfig {
            username: ADMIN_USERNAME.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        },
        payment: Some(PaymentConfig::Dummy(DummyConfig {
            plans: HashMap::from([(TEST_PRICE_ID.to_string(), plan())]),
        })),
        email: EmailConfig {
            transport: EmailTransportConfig::File {
                path: temp_dir.to_string_lossy().to_string(),
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn plan() -> PlanConfig {
    PlanConfig {
        product_id: TEST_PRODUCT_ID,
        plan_name: "Virtual Office".to_string(),
    }
}

/// In-memory partner API recording what it was sent.
#[derive(Default)]
pub struct MockPartner {
    sent: Mutex<Vec<SubscriptionPayload>>,
    stopped: Mutex<Vec<String>>,
    failure: Option<(u16, String)>,
}

impl MockPartner {
    /// A partner that answers every call with the given HTTP error.
    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            failure: Some((status, body.to_string())),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SubscriptionPayload> {
        self.sent.lock().unwrap().clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), PartnerError> {
        match &self.failure {
            Some((status, body)) => Err(PartnerError::Status {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PartnerApi for MockPartner {
    async fn create_subscription(&self, payload: &SubscriptionPayload) -> Result<serde_json::Value, PartnerError> {
        self.check()?;
        self.sent.lock().unwrap().push(payload.clone());
        Ok(serde_json::json!({ "external_id": payload.external_id }))
    }

    async fn subscription_status(&self, _external_id: &str) -> Result<String, PartnerError> {
        self.check()?;
        Ok("ACTIVE".to_string())
    }

    async fn stop_subscription(&self, external_id: &str) -> Result<(), PartnerError> {
        self.check()?;
        self.stopped.lock().unwrap().push(external_id.to_string());
        Ok(())
    }
}

pub fn create_test_state(pool: PgPool) -> AppState {
    create_test_state_with(pool, create_test_config(), Arc::new(MockPartner::default()))
}

pub fn create_test_state_with(pool: PgPool, config: Config, partner: Arc<dyn PartnerApi>) -> AppState {
    install_crypto_provider();
    let email = EmailService::new(&config.email).expect("Failed to create email service");
    let checkout = config.payment.as_ref().map(crate::payment_providers::create_provider);

    AppState::builder()
        .db(pool)
        .config(config)
        .partner(partner)
        .email(Arc::new(email))
        .maybe_checkout(checkout)
        .build()
}

pub fn create_test_server(state: AppState) -> TestServer {
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// Test server backed by a [`MockPartner`], returned so tests can inspect partner calls.
pub fn create_test_app(pool: PgPool) -> (TestServer, Arc<MockPartner>) {
    create_test_app_with(pool, create_test_config(), MockPartner::default())
}

pub fn create_test_app_with(pool: PgPool, config: Config, partner: MockPartner) -> (TestServer, Arc<MockPartner>) {
    let partner = Arc::new(partner);
    let state = create_test_state_with(pool, config, partner.clone());
    (create_test_server(state), partner)
}

/// `Authorization` header carrying the test admin credentials.
pub fn admin_auth_header() -> (String, String) {
    basic_auth_header(ADMIN_USERNAME, ADMIN_PASSWORD)
}

pub fn basic_auth_header(username: &str, password: &str) -> (String, String) {
    let encoded = STANDARD.encode(format!("{username}:{password}"));
    ("authorization".to_string(), format!("Basic {encoded}"))
}

pub async fn insert_token(pool: &PgPool, email: &str, expires_at: DateTime<Utc>, submitted: bool) -> KycToken {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut repo = KycTokens::new(&mut conn);

    let token = repo
        .create(&KycTokenCreateDBRequest {
            token: Uuid::new_v4(),
            email: email.to_string(),
            product_id: TEST_PRODUCT_ID,
            plan_name: "Virtual Office".to_string(),
            checkout_session_id: None,
            expires_at,
        })
        .await
        .expect("Failed to create token");

    if submitted {
        repo.mark_submitted(token.token).await.expect("Failed to mark token submitted");
        return repo.get_by_id(token.token).await.unwrap().unwrap();
    }

    token
}

pub fn subscription_request(external_id: &str, email: &str) -> SubscriptionCreateDBRequest {
    SubscriptionCreateDBRequest {
        external_id: external_id.to_string(),
        product_id: TEST_PRODUCT_ID,
        kyc_token: None,
        customer_email: email.to_string(),
        customer_first_name: "Grace".to_string(),
        customer_middle_name: None,
        customer_last_name: "Hopper".to_string(),
        company_name: "Acme Ltd".to_string(),
        trading_name: None,
        organisation_type: "LIMITED_COMPANY".to_string(),
        limited_company_number: Some("01234567".to_string()),
        telephone_number: Some("+44 20 7946 0000".to_string()),
        address_line_1: "1 High Street".to_string(),
        address_line_2: None,
        city: "London".to_string(),
        postcode: "EC1A 1BB".to_string(),
        country: "GB".to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
    }
}

fn member_request(external_id: &str, position: i32) -> CompanyMemberCreateDBRequest {
    CompanyMemberCreateDBRequest {
        external_id: external_id.to_string(),
        position,
        email: format!("owner{position}@acme.test"),
        first_name: "Ada".to_string(),
        middle_name: None,
        last_name: "Owner".to_string(),
        phone_number: None,
        date_of_birth: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
    }
}

/// A subscription with one member, as stored after a submission.
pub async fn insert_subscription(pool: &PgPool, external_id: &str, email: &str) -> Subscription {
    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let subscription = Subscriptions::new(&mut tx)
        .create(&subscription_request(external_id, email))
        .await
        .expect("Failed to create subscription");
    CompanyMembers::new(&mut tx)
        .create(&member_request(external_id, 0))
        .await
        .expect("Failed to create member");
    tx.commit().await.expect("Failed to commit");
    subscription
}

/// In-memory subscription, for code that does not touch the database.
pub fn sample_subscription(external_id: &str) -> Subscription {
    let request = subscription_request(external_id, "ceo@acme.test");
    let now = Utc::now();

    Subscription {
        external_id: request.external_id,
        product_id: request.product_id,
        kyc_token: None,
        customer_email: request.customer_email,
        customer_first_name: request.customer_first_name,
        customer_middle_name: request.customer_middle_name,
        customer_last_name: request.customer_last_name,
        company_name: request.company_name,
        trading_name: request.trading_name,
        organisation_type: request.organisation_type,
        limited_company_number: request.limited_company_number,
        telephone_number: request.telephone_number,
        address_line_1: request.address_line_1,
        address_line_2: request.address_line_2,
        city: request.city,
        postcode: request.postcode,
        country: request.country,
        start_date: request.start_date,
        review_status: ReviewStatus::PendingReview,
        review_reason: None,
        reviewed_at: None,
        partner_status: PartnerStatus::Pending,
        partner_error: None,
        forwarded_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_member(external_id: &str, position: i32) -> CompanyMember {
    let request = member_request(external_id, position);

    CompanyMember {
        id: position as i64 + 1,
        external_id: request.external_id,
        position: request.position,
        email: request.email,
        first_name: request.first_name,
        middle_name: request.middle_name,
        last_name: request.last_name,
        phone_number: request.phone_number,
        date_of_birth: request.date_of_birth,
        created_at: Utc::now(),
    }
}

/// A complete, valid submission for `token`.
pub fn submission_request(token: &str, email: &str) -> KycSubmissionRequest {
    KycSubmissionRequest {
        token: Some(token.to_string()),
        product_id: Some(TEST_PRODUCT_ID),
        customer_email: Some(email.to_string()),
        customer_first_name: Some("Grace".to_string()),
        customer_middle_name: None,
        customer_last_name: Some("Hopper".to_string()),
        company_name: Some("Acme Ltd".to_string()),
        trading_name: Some("Acme".to_string()),
        organisation_type: Some("LIMITED_COMPANY".to_string()),
        limited_company_number: Some("01234567".to_string()),
        phone_number: Some("+44 20 7946 0000".to_string()),
        address_line_1: Some("1 High Street".to_string()),
        address_line_2: None,
        city: Some("London".to_string()),
        postcode: Some("EC1A 1BB".to_string()),
        country: Some("United Kingdom".to_string()),
        members: vec![OwnerRequest {
            email: Some("owner0@acme.test".to_string()),
            first_name: Some("Ada".to_string()),
            middle_name: None,
            last_name: Some("Owner".to_string()),
            phone_number: None,
            date_of_birth: Some("1980-05-17".to_string()),
        }],
    }
}

/// The JSON body the onboarding form posts for [`submission_request`].
pub fn submission_json(token: &str, email: &str) -> serde_json::Value {
    serde_json::json!({
        "token": token,
        "product_id": TEST_PRODUCT_ID,
        "customer_email": email,
        "customer_first_name": "Grace",
        "customer_last_name": "Hopper",
        "company_name": "Acme Ltd",
        "trading_name": "Acme",
        "organisation_type": "LIMITED_COMPANY",
        "limited_company_number": "01234567",
        "phone_number": "+44 20 7946 0000",
        "address_line_1": "1 High Street",
        "city": "London",
        "postcode": "EC1A 1BB",
        "country": "United Kingdom",
        "members": [{
            "email": "owner0@acme.test",
            "first_name": "Ada",
            "last_name": "Owner",
            "date_of_birth": "1980-05-17"
        }]
    })
}
