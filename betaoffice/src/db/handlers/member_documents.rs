//! Database repository for uploaded owner documents.

use sha2::{Digest, Sha256};
use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{
        errors::Result,
        models::member_documents::{MemberDocument, MemberDocumentCreateDBRequest},
    },
    types::MemberId,
};

const METADATA_COLUMNS: &str = "id, member_id, kind, filename, content_type, size_bytes, sha256, created_at";

pub struct MemberDocuments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> MemberDocuments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Store a document, computing its size and digest.
    #[instrument(skip(self, request), fields(member_id = request.member_id, kind = ?request.kind, size = request.content.len()), err)]
    pub async fn create(&mut self, request: &MemberDocumentCreateDBRequest) -> Result<MemberDocument> {
        let sha256 = format!("{:x}", Sha256::digest(&request.content));

        let document = sqlx::query_as::<_, MemberDocument>(&format!(
            r#"
            INSERT INTO member_documents (member_id, kind, filename, content_type, size_bytes, sha256, content)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {METADATA_COLUMNS}
            "#
        ))
        .bind(request.member_id)
        .bind(request.kind)
        .bind(&request.filename)
        .bind(&request.content_type)
        .bind(request.content.len() as i64)
        .bind(sha256)
        .bind(&request.content)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(document)
    }

    /// Metadata for every document belonging to the given members.
    #[instrument(skip(self, member_ids), fields(count = member_ids.len()), err)]
    pub async fn list_for_members(&mut self, member_ids: &[MemberId]) -> Result<Vec<MemberDocument>> {
        let documents = sqlx::query_as::<_, MemberDocument>(&format!(
            "SELECT {METADATA_COLUMNS} FROM member_documents WHERE member_id = ANY($1) ORDER BY member_id, kind"
        ))
        .bind(member_ids)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(documents)
    }
}
