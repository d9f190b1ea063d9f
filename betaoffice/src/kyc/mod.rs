//! The KYC onboarding workflow.
//!
//! A customer pays at checkout and receives a one-time token by email ([`tokens`]). The token
//! unlocks the onboarding form, whose submission is checked ([`validation`]), stored in a single
//! transaction together with the token's consumption ([`submission`]), and then sent to the
//! partner API ([`forwarding`]). Forwarding happens after the commit: a partner outage leaves a
//! complete local record in `FAILED` state that an admin can forward again.

pub mod country;
pub mod forwarding;
pub mod submission;
pub mod tokens;
pub mod validation;

use chrono::{DateTime, Utc};

/// Build the external id of a new subscription: the email's local part, reduced to
/// `[a-z0-9._-]`, a dash, and the UTC submission time as `%Y%m%d%H%M%S`.
pub fn generate_external_id(email: &str, now: DateTime<Utc>) -> String {
    let local_part = email.split('@').next().unwrap_or_default();
    let mut sanitized: String = local_part
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    if sanitized.is_empty() {
        sanitized.push_str("customer");
    }

    format!("{sanitized}-{}", now.format("%Y%m%d%H%M%S"))
}
