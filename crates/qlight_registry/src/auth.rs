//! HTTP basic authentication for the device API
//!
//! Devices send `Authorization: Basic base64(name:key)`. Both parts are compared in
//! constant time against the configured credentials.

use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use constant_time_eq::constant_time_eq;
use qlight_common::QlightError;
use qlight_config::AuthConfig;
use std::sync::Arc;
use tracing::{debug, warn};

/// State for [`basic_auth_middleware`].
#[derive(Clone, Debug)]
pub struct BasicAuthState {
    /// `None` disables the check.
    pub credentials: Option<AuthConfig>,
}

/// Decode `Basic <base64(name:key)>` into its two parts.
pub fn parse_basic_credentials(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (name, key) = decoded.split_once(':')?;
    Some((name.to_string(), key.to_string()))
}

fn credentials_match(expected: &AuthConfig, name: &str, key: &str) -> bool {
    // evaluate both so timing doesn't reveal which part was wrong
    let name_ok = constant_time_eq(name.as_bytes(), expected.name.as_bytes());
    let key_ok = constant_time_eq(key.as_bytes(), expected.key.as_bytes());
    name_ok & key_ok
}

/// Reject requests without valid basic-auth credentials.
pub async fn basic_auth_middleware(
    State(auth_state): State<Arc<BasicAuthState>>,
    req: Request<AxumBody>,
    next: Next,
) -> Response {
    let Some(expected) = auth_state.credentials.as_ref() else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_credentials);

    match provided {
        Some((name, key)) if credentials_match(expected, &name, &key) => {
            debug!(user = %name, "request authenticated");
            next.run(req).await
        }
        Some((name, _)) => {
            warn!(user = %name, path = %req.uri().path(), "invalid credentials");
            QlightError::AuthError("invalid credentials".to_string()).into_response()
        }
        None => {
            warn!(path = %req.uri().path(), "missing or malformed authorization header");
            QlightError::AuthError("missing credentials".to_string()).into_response()
        }
    }
}
