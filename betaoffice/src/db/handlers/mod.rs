//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection` (usually a transaction) and returns models from
//! [`crate::db::models`]. Create them from a transaction whenever several writes must land together:
//!
//! ```ignore
//! use betaoffice::db::handlers::{Subscriptions, Repository};
//!
//! let mut tx = pool.begin().await?;
//! let subscription = Subscriptions::new(&mut tx).create(&request).await?;
//! tx.commit().await?;
//! ```
//!
//! - [`KycTokens`]: token lifecycle (issue, lock, consume)
//! - [`Subscriptions`]: onboarding records, review and partner sync transitions
//! - [`CompanyMembers`]: owners of a subscription
//! - [`MemberDocuments`]: uploaded owner documents
//! - [`ScannedMails`]: inbound mail notifications

pub mod company_members;
pub mod kyc_tokens;
pub mod member_documents;
pub mod repository;
pub mod scanned_mails;
pub mod subscriptions;

pub use company_members::CompanyMembers;
pub use kyc_tokens::KycTokens;
pub use member_documents::MemberDocuments;
pub use repository::Repository;
pub use scanned_mails::ScannedMails;
pub use subscriptions::Subscriptions;
