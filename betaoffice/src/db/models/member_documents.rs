//! Database models for owner identity and address documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::MemberId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    ProofOfId,
    ProofOfAddress,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::ProofOfId => "PROOF_OF_ID",
            DocumentKind::ProofOfAddress => "PROOF_OF_ADDRESS",
        }
    }

    /// Parse the suffix of a multipart upload field, e.g. `proof_of_id` in `owners[0][proof_of_id]`.
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "proof_of_id" => Some(DocumentKind::ProofOfId),
            "proof_of_address" => Some(DocumentKind::ProofOfAddress),
            _ => None,
        }
    }
}

/// Document metadata, without the stored content.
#[derive(Debug, Clone, FromRow)]
pub struct MemberDocument {
    pub id: i64,
    pub member_id: MemberId,
    pub kind: DocumentKind,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

/// Request for storing a document
#[derive(Debug, Clone)]
pub struct MemberDocumentCreateDBRequest {
    pub member_id: MemberId,
    pub kind: DocumentKind,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}
