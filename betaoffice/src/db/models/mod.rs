//! Database record models matching table schemas.
//!
//! These structs correspond to table rows and derive `sqlx::FromRow`. They are kept separate from
//! the API models in [`crate::api::models`] so storage and wire formats can evolve independently.
//!
//! - [`kyc_tokens`]: one-time onboarding credentials
//! - [`subscriptions`]: company onboarding records, review and partner sync state
//! - [`company_members`]: beneficial owners of a subscription
//! - [`member_documents`]: uploaded identity/address documents
//! - [`scanned_mails`]: inbound scanned-mail notifications

pub mod company_members;
pub mod kyc_tokens;
pub mod member_documents;
pub mod scanned_mails;
pub mod subscriptions;
