//! API request/response models.
//!
//! These are the wire formats of the HTTP API, kept separate from the database models in
//! [`crate::db::models`]. All of them derive `utoipa::ToSchema` for the OpenAPI document.

pub mod kyc;
pub mod mail;
pub mod subscriptions;
pub mod tokens;
