//! API request and response models for scanned-mail notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::{IntoParams, ToSchema};

use crate::db::models::scanned_mails::{ScannedMail, ScannedMailCreateDBRequest};

/// Notification sent by the mail-scanning partner when a letter has been scanned.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ScannedMailWebhook {
    /// External id of the subscription the mail belongs to
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub document_title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Link to the scanned document
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_envelope_front: Option<String>,
    #[serde(default)]
    pub url_envelope_back: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

impl ScannedMailWebhook {
    /// The first non-blank link that is not an absolute http(s) URL.
    pub fn invalid_link(&self) -> Option<&str> {
        [&self.url, &self.url_envelope_front, &self.url_envelope_back]
            .into_iter()
            .filter_map(|url| url.as_deref())
            .filter(|url| !url.trim().is_empty())
            .find(|url| !is_web_url(url))
    }
}

pub fn is_web_url(raw: &str) -> bool {
    Url::parse(raw.trim()).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

impl From<ScannedMailWebhook> for ScannedMailCreateDBRequest {
    fn from(webhook: ScannedMailWebhook) -> Self {
        Self {
            external_id: webhook.external_id.trim().to_string(),
            sender_name: webhook.sender_name,
            document_title: webhook.document_title,
            summary: webhook.summary,
            url: webhook.url,
            url_envelope_front: webhook.url_envelope_front,
            url_envelope_back: webhook.url_envelope_back,
            company_name: webhook.company_name,
            received_at: webhook.received_at,
        }
    }
}

/// Acknowledgement of a stored notification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScannedMailAccepted {
    pub id: i64,
    pub external_id: String,
    /// Whether the customer was emailed
    pub notified: bool,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct MailQuery {
    pub external_id: String,
    /// Number of items to skip (default: 0)
    pub skip: Option<i64>,
    /// Maximum number of items to return (default: 50, max: 200)
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScannedMailResponse {
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
    pub created_at: DateTime<Utc>,
}

impl From<ScannedMail> for ScannedMailResponse {
    fn from(mail: ScannedMail) -> Self {
        Self {
            id: mail.id,
            external_id: mail.external_id,
            sender_name: mail.sender_name,
            document_title: mail.document_title,
            summary: mail.summary,
            url: mail.url,
            url_envelope_front: mail.url_envelope_front,
            url_envelope_back: mail.url_envelope_back,
            company_name: mail.company_name,
            received_at: mail.received_at,
            created_at: mail.created_at,
        }
    }
}
