//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL.
//!
//! - [`handlers`]: Repository implementations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Transactions
//!
//! Repositories borrow a connection, so the caller decides the transaction boundary. A KYC
//! submission writes the subscription, its members and documents, and consumes the token inside
//! one transaction; nothing is visible until it commits.
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and run on startup through [`crate::migrator`]:
//!
//! ```ignore
//! betaoffice::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
