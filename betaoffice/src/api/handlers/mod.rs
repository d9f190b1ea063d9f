//! HTTP request handlers for all API endpoints.

pub mod admin;
pub mod customers;
pub mod kyc;
pub mod tokens;
pub mod webhooks;
