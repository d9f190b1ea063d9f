//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] documents every public endpoint. It is served at `/api-docs/openapi.json` and
//! rendered with Scalar at `/docs`.

mod onboarding;

pub use onboarding::ApiDoc;
