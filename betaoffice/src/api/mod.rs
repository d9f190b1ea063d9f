//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Tokens** (`/api/create-token`, `/api/recover-token`): KYC token issuance and lookup
//! - **KYC** (`/api/submit-kyc`): onboarding form submission, JSON or multipart
//! - **Webhooks** (`/webhook/stripe`, `/webhook`): paid checkouts and scanned-mail notifications
//! - **Customers** (`/customer`, `/api/mail`): lookups for the customer dashboard
//! - **Admin** (`/api/admin/*`): Basic-Auth protected review of submissions
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
pub mod models;
