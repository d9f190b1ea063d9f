//! Persisting a validated KYC submission.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::{
    api::models::kyc::UploadedDocument,
    db::{
        handlers::{CompanyMembers, KycTokens, MemberDocuments, Repository, Subscriptions},
        models::{
            company_members::CompanyMemberCreateDBRequest, member_documents::MemberDocumentCreateDBRequest,
            subscriptions::{Subscription, SubscriptionCreateDBRequest},
        },
    },
    errors::{Error, Result},
    kyc::{generate_external_id, tokens::lock_usable, validation::ValidatedSubmission},
    types::abbrev_uuid,
};

/// Store a submission and consume its token in one transaction.
///
/// The token row is locked first, so of two concurrent submissions with the same token exactly
/// one commits and the other sees the token as used. Nothing is written if any step fails.
#[instrument(skip_all, fields(token = %abbrev_uuid(&submission.token)), err)]
pub async fn persist_submission(
    db: &PgPool,
    submission: &ValidatedSubmission,
    documents: Vec<UploadedDocument>,
    now: DateTime<Utc>,
) -> Result<Subscription> {
    let mut tx = db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let token = lock_usable(&mut tx, submission.token, now).await?;

    if let Some(product_id) = submission.product_id
        && product_id != token.product_id
    {
        return Err(Error::BadRequest {
            message: "product_id does not match the purchased plan".to_string(),
        });
    }

    if Subscriptions::new(&mut tx).get_by_email(&submission.customer_email).await?.is_some() {
        return Err(Error::Conflict {
            message: "A subscription already exists for this email address".to_string(),
        });
    }

    let request = SubscriptionCreateDBRequest {
        external_id: generate_external_id(&submission.customer_email, now),
        product_id: token.product_id,
        kyc_token: Some(token.token),
        customer_email: submission.customer_email.clone(),
        customer_first_name: submission.customer_first_name.clone(),
        customer_middle_name: submission.customer_middle_name.clone(),
        customer_last_name: submission.customer_last_name.clone(),
        company_name: submission.company_name.clone(),
        trading_name: submission.trading_name.clone(),
        organisation_type: submission.organisation_type.clone(),
        limited_company_number: submission.limited_company_number.clone(),
        telephone_number: submission.telephone_number.clone(),
        address_line_1: submission.address_line_1.clone(),
        address_line_2: submission.address_line_2.clone(),
        city: submission.city.clone(),
        postcode: submission.postcode.clone(),
        country: submission.country.clone(),
        start_date: now.date_naive(),
    };
    let subscription = Subscriptions::new(&mut tx).create(&request).await?;

    let mut member_ids = Vec::with_capacity(submission.owners.len());
    for (position, owner) in submission.owners.iter().enumerate() {
        let member = CompanyMembers::new(&mut tx)
            .create(&CompanyMemberCreateDBRequest {
                external_id: subscription.external_id.clone(),
                position: position as i32,
                email: owner.email.clone(),
                first_name: owner.first_name.clone(),
                middle_name: owner.middle_name.clone(),
                last_name: owner.last_name.clone(),
                phone_number: owner.phone_number.clone(),
                date_of_birth: owner.date_of_birth,
            })
            .await?;
        member_ids.push(member.id);
    }

    let document_count = documents.len();
    for document in documents {
        let member_id = *member_ids.get(document.owner_index).ok_or_else(|| Error::BadRequest {
            message: format!(
                "Document for owner {} does not match any owner in the submission",
                document.owner_index + 1
            ),
        })?;

        MemberDocuments::new(&mut tx)
            .create(&MemberDocumentCreateDBRequest {
                member_id,
                kind: document.kind,
                filename: document.filename,
                content_type: document.content_type,
                content: document.content,
            })
            .await?;
    }

    if !KycTokens::new(&mut tx).mark_submitted(token.token).await? {
        return Err(Error::Conflict {
            message: "This KYC token has already been used.".to_string(),
        });
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!(
        external_id = %subscription.external_id,
        members = member_ids.len(),
        documents = document_count,
        "Stored KYC submission"
    );

    Ok(subscription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::models::{member_documents::DocumentKind, subscriptions::PartnerStatus},
        kyc::validation::validate_submission,
        test_utils::{insert_token, submission_request},
    };
    use chrono::Duration;

    async fn validated(pool: &PgPool, email: &str) -> ValidatedSubmission {
        let token = insert_token(pool, email, Utc::now() + Duration::days(3), false).await;
        let request = submission_request(&token.token.to_string(), email);
        validate_submission(&request, Utc::now().date_naive(), 18).unwrap()
    }

    #[sqlx::test]
    async fn test_persist_submission(pool: PgPool) {
        let submission = validated(&pool, "ceo@acme.test").await;
        let documents = vec![UploadedDocument {
            owner_index: 0,
            kind: DocumentKind::ProofOfId,
            filename: Some("passport.jpg".to_string()),
            content_type: Some("image/jpeg".to_string()),
            content: vec![0xff, 0xd8, 0xff],
        }];

        let subscription = persist_submission(&pool, &submission, documents, Utc::now()).await.unwrap();

        assert!(subscription.external_id.starts_with("ceo-"));
        assert_eq!(subscription.country, "GB");
        assert_eq!(subscription.partner_status, PartnerStatus::Pending);

        let mut conn = pool.acquire().await.unwrap();
        let token = KycTokens::new(&mut conn).get_by_id(submission.token).await.unwrap().unwrap();
        assert!(token.kyc_submitted);

        let members = CompanyMembers::new(&mut conn).list(&subscription.external_id).await.unwrap();
        assert_eq!(members.len(), 1);
        let documents = MemberDocuments::new(&mut conn).list_for_members(&[members[0].id]).await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].size_bytes, 3);
    }

    #[sqlx::test]
    async fn test_token_cannot_be_reused(pool: PgPool) {
        let submission = validated(&pool, "ceo@acme.test").await;
        persist_submission(&pool, &submission, vec![], Utc::now()).await.unwrap();

        let mut again = submission.clone();
        again.customer_email = "other@acme.test".to_string();
        let result = persist_submission(&pool, &again, vec![], Utc::now()).await;

        assert!(matches!(result, Err(Error::Conflict { .. })));
    }

    #[sqlx::test]
    async fn test_expired_token_is_gone(pool: PgPool) {
        let submission = validated(&pool, "ceo@acme.test").await;

        let later = Utc::now() + Duration::days(4);
        let result = persist_submission(&pool, &submission, vec![], later).await;

        assert!(matches!(result, Err(Error::Gone { .. })));
    }

    #[sqlx::test]
    async fn test_duplicate_customer_email_rolls_back(pool: PgPool) {
        let first = validated(&pool, "ceo@acme.test").await;
        persist_submission(&pool, &first, vec![], Utc::now()).await.unwrap();

        // A second paid token for the same customer email
        let token = insert_token(&pool, "ceo+2@acme.test", Utc::now() + Duration::days(3), false).await;
        let mut second = first.clone();
        second.token = token.token;
        second.customer_email = "CEO@acme.test".to_string();

        let result = persist_submission(&pool, &second, vec![], Utc::now()).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let mut conn = pool.acquire().await.unwrap();
        let token = KycTokens::new(&mut conn).get_by_id(token.token).await.unwrap().unwrap();
        assert!(!token.kyc_submitted, "token must stay usable when the submission is rejected");
    }

    #[sqlx::test]
    async fn test_product_mismatch_is_rejected(pool: PgPool) {
        let mut submission = validated(&pool, "ceo@acme.test").await;
        submission.product_id = Some(1);

        let result = persist_submission(&pool, &submission, vec![], Utc::now()).await;
        assert!(matches!(result, Err(Error::BadRequest { .. })));
    }
}
