//! Database repository for company members.

use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{
        errors::Result,
        handlers::repository::Repository,
        models::company_members::{CompanyMember, CompanyMemberCreateDBRequest},
    },
    types::MemberId,
};

pub struct CompanyMembers<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for CompanyMembers<'c> {
    type CreateRequest = CompanyMemberCreateDBRequest;
    type Response = CompanyMember;
    type Id = MemberId;
    /// Members are only ever listed per subscription
    type Filter = String;

    #[instrument(skip(self, request), fields(external_id = %request.external_id, position = request.position), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let member = sqlx::query_as::<_, CompanyMember>(
            r#"
            INSERT INTO company_members (external_id, position, email, first_name, middle_name, last_name, phone_number, date_of_birth)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&request.external_id)
        .bind(request.position)
        .bind(&request.email)
        .bind(&request.first_name)
        .bind(&request.middle_name)
        .bind(&request.last_name)
        .bind(&request.phone_number)
        .bind(request.date_of_birth)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(member)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let member = sqlx::query_as::<_, CompanyMember>("SELECT * FROM company_members WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(member)
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, external_id: &Self::Filter) -> Result<Vec<Self::Response>> {
        let members = sqlx::query_as::<_, CompanyMember>("SELECT * FROM company_members WHERE external_id = $1 ORDER BY position")
            .bind(external_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(members)
    }
}

impl<'c> CompanyMembers<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Subscriptions;
    use crate::test_utils::subscription_request;
    use chrono::NaiveDate;
    use sqlx::PgPool;

    fn member(external_id: &str, position: i32, first_name: &str) -> CompanyMemberCreateDBRequest {
        CompanyMemberCreateDBRequest {
            external_id: external_id.to_string(),
            position,
            email: format!("{}@acme.test", first_name.to_lowercase()),
            first_name: first_name.to_string(),
            middle_name: None,
            last_name: "Owner".to_string(),
            phone_number: None,
            date_of_birth: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
        }
    }

    #[sqlx::test]
    async fn test_members_listed_in_position_order(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        Subscriptions::new(&mut conn)
            .create(&subscription_request("a-1", "ceo@acme.test"))
            .await
            .unwrap();

        let mut repo = CompanyMembers::new(&mut conn);
        repo.create(&member("a-1", 1, "Bea")).await.unwrap();
        let first = repo.create(&member("a-1", 0, "Ada")).await.unwrap();

        let members = repo.list(&"a-1".to_string()).await.unwrap();
        assert_eq!(members.iter().map(|m| m.first_name.as_str()).collect::<Vec<_>>(), vec!["Ada", "Bea"]);
        assert_eq!(repo.get_by_id(first.id).await.unwrap().unwrap().email, "ada@acme.test");
    }

    #[sqlx::test]
    async fn test_member_requires_subscription(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = CompanyMembers::new(&mut conn);

        let err = repo.create(&member("missing", 0, "Ada")).await.unwrap_err();
        assert!(matches!(err, crate::db::errors::DbError::ForeignKeyViolation { .. }));
    }
}
