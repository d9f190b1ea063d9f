//! Database models for company members (beneficial owners and directors).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::types::MemberId;

/// Database entity model
#[derive(Debug, Clone, FromRow)]
pub struct CompanyMember {
    pub id: MemberId,
    pub external_id: String,
    /// Zero-based order in which the owner was submitted
    pub position: i32,
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub date_of_birth: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Request for creating a company member
#[derive(Debug, Clone)]
pub struct CompanyMemberCreateDBRequest {
    pub external_id: String,
    pub position: i32,
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub date_of_birth: NaiveDate,
}
