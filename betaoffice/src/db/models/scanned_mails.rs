//! Database models for scanned-mail notifications.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database entity model
#[derive(Debug, Clone, FromRow)]
pub struct ScannedMail {
    pub id: i64,
    pub external_id: String,
    pub sender_name: Option<String>,
    pub document_title: Option<String>,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub url_envelope_front: Option<String>,
    pub url_envelope_back: Option<String>,
    pub company_name: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Request for recording an inbound mail notification
#[derive(Debug, Clone, Default)]
pub struct ScannedMailCreateDBRequest {
    pub external_id: String,
    pub sender_name: Option<String>,
    pub document_title: Option<String>,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub url_envelope_front: Option<String>,
    pub url_envelope_back: Option<String>,
    pub company_name: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
}

/// Filter for listing scanned mail
#[derive(Debug, Clone)]
pub struct ScannedMailFilter {
    pub external_id: Option<String>,
    pub skip: i64,
    pub limit: i64,
}
