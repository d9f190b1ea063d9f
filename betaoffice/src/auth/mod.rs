//! Authentication for the admin surface.
//!
//! Customer-facing endpoints are authorised by the KYC token they carry, so the only
//! credential check in the service is the admin Basic-Auth guard in [`admin`].

pub mod admin;

pub use admin::AdminUser;
