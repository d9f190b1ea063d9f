//! Database repository for scanned-mail notifications.

use sqlx::{PgConnection, QueryBuilder};
use tracing::instrument;

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::scanned_mails::{ScannedMail, ScannedMailCreateDBRequest, ScannedMailFilter},
};

pub struct ScannedMails<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for ScannedMails<'c> {
    type CreateRequest = ScannedMailCreateDBRequest;
    type Response = ScannedMail;
    type Id = i64;
    type Filter = ScannedMailFilter;

    #[instrument(skip(self, request), fields(external_id = %request.external_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mail = sqlx::query_as::<_, ScannedMail>(
            r#"
            INSERT INTO scanned_mails (
                external_id, sender_name, document_title, summary, url,
                url_envelope_front, url_envelope_back, company_name, received_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&request.external_id)
        .bind(&request.sender_name)
        .bind(&request.document_title)
        .bind(&request.summary)
        .bind(&request.url)
        .bind(&request.url_envelope_front)
        .bind(&request.url_envelope_back)
        .bind(&request.company_name)
        .bind(request.received_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(mail)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mail = sqlx::query_as::<_, ScannedMail>("SELECT * FROM scanned_mails WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(mail)
    }

    /// Newest first.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM scanned_mails WHERE 1=1");

        if let Some(external_id) = &filter.external_id {
            query.push(" AND external_id = ");
            query.push_bind(external_id);
        }

        query.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let mails = query.build_query_as::<ScannedMail>().fetch_all(&mut *self.db).await?;
        Ok(mails)
    }
}

impl<'c> ScannedMails<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn mark_notified(&mut self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE scanned_mails SET notified_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    fn mail(external_id: &str, title: &str) -> ScannedMailCreateDBRequest {
        ScannedMailCreateDBRequest {
            external_id: external_id.to_string(),
            document_title: Some(title.to_string()),
            url: Some(format!("https://scans.example.com/{title}.pdf")),
            ..Default::default()
        }
    }

    #[sqlx::test]
    async fn test_list_newest_first_per_external_id(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ScannedMails::new(&mut conn);

        repo.create(&mail("a-1", "first")).await.unwrap();
        repo.create(&mail("a-2", "other")).await.unwrap();
        let latest = repo.create(&mail("a-1", "second")).await.unwrap();

        let mails = repo
            .list(&ScannedMailFilter {
                external_id: Some("a-1".to_string()),
                skip: 0,
                limit: 10,
            })
            .await
            .unwrap();

        assert_eq!(mails.len(), 2);
        assert_eq!(mails[0].id, latest.id);
        assert_eq!(mails[1].document_title.as_deref(), Some("first"));
    }

    #[sqlx::test]
    async fn test_mark_notified(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = ScannedMails::new(&mut conn);

        let created = repo.create(&mail("a-1", "letter")).await.unwrap();
        assert!(created.notified_at.is_none());

        assert!(repo.mark_notified(created.id).await.unwrap());
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert!(fetched.notified_at.is_some());
    }
}
