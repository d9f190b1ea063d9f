//! Database repository for subscriptions.

use chrono::Duration;
use sqlx::{PgConnection, QueryBuilder};
use tracing::instrument;

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::subscriptions::{PartnerStatus, ReviewStatus, Subscription, SubscriptionCreateDBRequest, SubscriptionFilter},
};

pub struct Subscriptions<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Subscriptions<'c> {
    type CreateRequest = SubscriptionCreateDBRequest;
    type Response = Subscription;
    type Id = String;
    type Filter = SubscriptionFilter;

    #[instrument(skip(self, request), fields(external_id = %request.external_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (
                external_id, product_id, kyc_token, customer_email, customer_first_name, customer_middle_name,
                customer_last_name, company_name, trading_name, organisation_type, limited_company_number,
                telephone_number, address_line_1, address_line_2, city, postcode, country, start_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(&request.external_id)
        .bind(request.product_id)
        .bind(request.kyc_token)
        .bind(&request.customer_email)
        .bind(&request.customer_first_name)
        .bind(&request.customer_middle_name)
        .bind(&request.customer_last_name)
        .bind(&request.company_name)
        .bind(&request.trading_name)
        .bind(&request.organisation_type)
        .bind(&request.limited_company_number)
        .bind(&request.telephone_number)
        .bind(&request.address_line_1)
        .bind(&request.address_line_2)
        .bind(&request.city)
        .bind(&request.postcode)
        .bind(&request.country)
        .bind(request.start_date)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(subscription)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, external_id: Self::Id) -> Result<Option<Self::Response>> {
        let subscription = sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(subscription)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM subscriptions WHERE 1=1");

        if let Some(review_status) = filter.review_status {
            query.push(" AND review_status = ");
            query.push_bind(review_status);
        }

        if let Some(partner_status) = filter.partner_status {
            query.push(" AND partner_status = ");
            query.push_bind(partner_status);
        }

        query.push(" ORDER BY created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let subscriptions = query.build_query_as::<Subscription>().fetch_all(&mut *self.db).await?;
        Ok(subscriptions)
    }
}

impl<'c> Subscriptions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Case-insensitive lookup by customer email.
    #[instrument(skip(self, email), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE LOWER(customer_email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(subscription)
    }

    /// Record an admin decision. Returns `None` if the subscription is missing or no longer
    /// pending review.
    #[instrument(skip(self, reason), err)]
    pub async fn review(&mut self, external_id: &str, status: ReviewStatus, reason: Option<&str>) -> Result<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET review_status = $2, review_reason = $3, reviewed_at = NOW(), updated_at = NOW()
            WHERE external_id = $1 AND review_status = 'PENDING_REVIEW'
            RETURNING *
            "#,
        )
        .bind(external_id)
        .bind(status)
        .bind(reason)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(subscription)
    }

    /// Claim a subscription for forwarding to the partner API.
    ///
    /// Only pending and failed subscriptions can be claimed, plus in-flight ones whose claim is
    /// older than `stale_after` (the forwarder died mid-call). Rejected submissions are never
    /// claimed. Returns `None` when nothing was
    /// claimed, so two forwarders can never send the same subscription concurrently.
    #[instrument(skip(self), err)]
    pub async fn claim_for_forwarding(&mut self, external_id: &str, stale_after: Duration) -> Result<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET partner_status = 'IN_FLIGHT', updated_at = NOW()
            WHERE external_id = $1
              AND review_status <> 'REJECTED'
              AND (
                partner_status IN ('PENDING', 'FAILED')
                OR (partner_status = 'IN_FLIGHT' AND updated_at < NOW() - make_interval(secs => $2))
              )
            RETURNING *
            "#,
        )
        .bind(external_id)
        .bind(stale_after.num_seconds() as f64)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(subscription)
    }

    #[instrument(skip(self), err)]
    pub async fn mark_forwarded(&mut self, external_id: &str) -> Result<Subscription> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET partner_status = 'FORWARDED', partner_error = NULL, forwarded_at = NOW(), updated_at = NOW()
            WHERE external_id = $1
            RETURNING *
            "#,
        )
        .bind(external_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(subscription)
    }

    #[instrument(skip(self, error), err)]
    pub async fn mark_forward_failed(&mut self, external_id: &str, error: &str) -> Result<Subscription> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET partner_status = 'FAILED', partner_error = $2, updated_at = NOW()
            WHERE external_id = $1
            RETURNING *
            "#,
        )
        .bind(external_id)
        .bind(error)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::subscription_request;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_create_and_get(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        let created = repo.create(&subscription_request("acme-20250101120000", "ceo@acme.test")).await.unwrap();
        assert_eq!(created.review_status, ReviewStatus::PendingReview);
        assert_eq!(created.partner_status, PartnerStatus::Pending);

        let fetched = repo.get_by_id("acme-20250101120000".to_string()).await.unwrap().unwrap();
        assert_eq!(fetched.customer_email, "ceo@acme.test");

        let by_email = repo.get_by_email("CEO@ACME.TEST").await.unwrap().unwrap();
        assert_eq!(by_email.external_id, "acme-20250101120000");
    }

    #[sqlx::test]
    async fn test_duplicate_email_is_unique_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        repo.create(&subscription_request("a-1", "ceo@acme.test")).await.unwrap();
        let err = repo.create(&subscription_request("a-2", "Ceo@Acme.Test")).await.unwrap_err();

        assert!(err.is_unique_violation_of("subscriptions_customer_email_key"));
    }

    #[sqlx::test]
    async fn test_review_only_from_pending(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);
        repo.create(&subscription_request("a-1", "ceo@acme.test")).await.unwrap();

        let reviewed = repo
            .review("a-1", ReviewStatus::Rejected, Some("Blurry passport"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reviewed.review_status, ReviewStatus::Rejected);
        assert_eq!(reviewed.review_reason.as_deref(), Some("Blurry passport"));
        assert!(reviewed.reviewed_at.is_some());

        assert!(repo.review("a-1", ReviewStatus::Approved, None).await.unwrap().is_none());
        assert!(repo.review("missing", ReviewStatus::Approved, None).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn test_claim_for_forwarding_is_exclusive(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);
        repo.create(&subscription_request("a-1", "ceo@acme.test")).await.unwrap();

        let claimed = repo.claim_for_forwarding("a-1", Duration::minutes(5)).await.unwrap().unwrap();
        assert_eq!(claimed.partner_status, PartnerStatus::InFlight);
        assert!(repo.claim_for_forwarding("a-1", Duration::minutes(5)).await.unwrap().is_none());

        let failed = repo.mark_forward_failed("a-1", "503 from partner").await.unwrap();
        assert_eq!(failed.partner_status, PartnerStatus::Failed);
        assert_eq!(failed.partner_error.as_deref(), Some("503 from partner"));

        // Failed subscriptions can be claimed again
        repo.claim_for_forwarding("a-1", Duration::minutes(5)).await.unwrap().unwrap();
        let forwarded = repo.mark_forwarded("a-1").await.unwrap();
        assert_eq!(forwarded.partner_status, PartnerStatus::Forwarded);
        assert!(forwarded.partner_error.is_none());
        assert!(forwarded.forwarded_at.is_some());

        assert!(repo.claim_for_forwarding("a-1", Duration::minutes(5)).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn test_stale_in_flight_claim_can_be_retaken(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);
        repo.create(&subscription_request("a-1", "ceo@acme.test")).await.unwrap();

        repo.claim_for_forwarding("a-1", Duration::minutes(5)).await.unwrap().unwrap();
        sqlx::query("UPDATE subscriptions SET updated_at = NOW() - INTERVAL '1 hour' WHERE external_id = 'a-1'")
            .execute(&pool)
            .await
            .unwrap();

        assert!(repo.claim_for_forwarding("a-1", Duration::minutes(5)).await.unwrap().is_some());
    }

    #[sqlx::test]
    async fn test_list_filters_by_status(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);
        repo.create(&subscription_request("a-1", "one@acme.test")).await.unwrap();
        repo.create(&subscription_request("a-2", "two@acme.test")).await.unwrap();
        repo.review("a-2", ReviewStatus::Approved, None).await.unwrap();

        let all = repo.list(&SubscriptionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let pending = repo
            .list(&SubscriptionFilter {
                review_status: Some(ReviewStatus::PendingReview),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].external_id, "a-1");
    }
}
