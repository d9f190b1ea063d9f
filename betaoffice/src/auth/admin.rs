//! Basic-Auth guard for the admin review API.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use tracing::{debug, instrument};

use crate::{
    AppState,
    config::AdminConfig,
    errors::{Error, Result},
};

/// An authenticated admin. Add it as a handler argument to require admin credentials.
///
/// Requests without a usable `Authorization: Basic ...` header are rejected with 401 and a
/// `WWW-Authenticate` challenge; well-formed but wrong credentials are rejected with 403.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub username: String,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let (username, password) = basic_credentials(parts)?;

        if !credentials_match(&state.config.admin, &username, &password) {
            debug!(username = %username, "Rejected admin credentials");
            return Err(Error::Forbidden {
                message: "Invalid admin credentials".to_string(),
            });
        }

        Ok(AdminUser { username })
    }
}

/// Decode the `username:password` pair from a Basic `Authorization` header.
fn basic_credentials(parts: &Parts) -> Result<(String, String)> {
    let unauthenticated = || Error::Unauthenticated { message: None };

    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(unauthenticated)?;

    let (scheme, encoded) = value.trim().split_once(' ').ok_or_else(unauthenticated)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(unauthenticated());
    }

    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| unauthenticated())?;
    let decoded = String::from_utf8(decoded).map_err(|_| unauthenticated())?;
    let (username, password) = decoded.split_once(':').ok_or_else(unauthenticated)?;

    Ok((username.to_string(), password.to_string()))
}

fn credentials_match(config: &AdminConfig, username: &str, password: &str) -> bool {
    // Evaluate both so timing does not reveal which half was wrong
    let user_ok = constant_time_eq(username.as_bytes(), config.username.as_bytes());
    let pass_ok = constant_time_eq(password.as_bytes(), config.password.as_bytes());
    user_ok & pass_ok
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/admin/submissions");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn admin() -> AdminConfig {
        AdminConfig {
            username: "admin".to_string(),
            password: "s3cret".to_string(),
        }
    }

    #[test]
    fn test_basic_credentials() {
        let encoded = STANDARD.encode("admin:s3cret:with-colon");
        let (user, pass) = basic_credentials(&parts(Some(&format!("Basic {encoded}")))).unwrap();
        assert_eq!(user, "admin");
        assert_eq!(pass, "s3cret:with-colon");
    }

    #[test]
    fn test_missing_or_malformed_header_is_unauthenticated() {
        for header in [None, Some("Bearer abc"), Some("Basic !!!notbase64"), Some("Basic")] {
            let result = basic_credentials(&parts(header));
            assert!(matches!(result, Err(Error::Unauthenticated { .. })), "header: {header:?}");
        }

        let no_colon = STANDARD.encode("admin");
        assert!(matches!(
            basic_credentials(&parts(Some(&format!("Basic {no_colon}")))),
            Err(Error::Unauthenticated { .. })
        ));
    }

    #[test]
    fn test_credentials_match() {
        assert!(credentials_match(&admin(), "admin", "s3cret"));
        assert!(!credentials_match(&admin(), "admin", "wrong"));
        assert!(!credentials_match(&admin(), "root", "s3cret"));
        assert!(!credentials_match(&admin(), "", ""));
    }
}
