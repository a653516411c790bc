use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::{HttpStatusCode, QlightError};

/// Realm advertised in `WWW-Authenticate` challenges.
pub const AUTH_REALM: &str = "qlight";

/// Extension trait for QlightError to convert it to an Axum HTTP response.
pub trait IntoHttpResponse {
    /// Converts the error into an Axum HTTP response.
    fn into_http_response(self) -> Response;
}

impl IntoHttpResponse for QlightError {
    fn into_http_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Clients match on the "ERROR:" prefix, so the body is plain text.
        let body = error_text(&self);

        if matches!(self, QlightError::AuthError(_)) {
            let challenge = format!("Basic realm=\"{}\"", AUTH_REALM);
            return (status_code, [(header::WWW_AUTHENTICATE, challenge)], body).into_response();
        }

        (status_code, body).into_response()
    }
}

/// Implement IntoResponse for QlightError to make it easier to use in Axum handlers.
impl IntoResponse for QlightError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

/// `ERROR:<message>` as sent on the wire.
pub fn error_text(err: &QlightError) -> String {
    format!("ERROR:{}", err)
}

/// A `200 OK` plain-text response with the `OK:` prefix.
pub fn ok_text(message: impl std::fmt::Display) -> Response {
    (StatusCode::OK, format!("OK:{}", message)).into_response()
}

/// A `200 OK` plain-text response with the `ERROR:` prefix.
///
/// Used for negative results that are not faults, such as a lookup miss.
pub fn negative_text(message: impl std::fmt::Display) -> Response {
    (StatusCode::OK, format!("ERROR:{}", message)).into_response()
}
