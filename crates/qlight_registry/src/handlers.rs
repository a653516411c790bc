//! HTTP handlers for the device API
//!
//! Responses are plain text: `OK:<value>` on success, `ERROR:<message>` otherwise.
//! Lookup misses are ordinary `200` answers with the `ERROR:` prefix; malformed input
//! is a `400`.

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    response::Response,
};
use qlight_common::{log_api_call, negative_text, ok_text, parse_error, qualify_query, QlightError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::extract::ClientAddress;
use crate::models::{CheckIn, DeviceMode};
use crate::registry::DeviceRegistry;
use crate::resolver::Resolution;

/// Version announced by the banner route.
pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Shared state for the registry handlers
#[derive(Clone, Debug)]
pub struct RegistryState {
    pub registry: Arc<DeviceRegistry>,
    /// Take the caller address from `X-Forwarded-For` when present.
    pub trust_forwarded_for: bool,
}

/// Form sent by a device on check-in and update. Missing fields are empty.
#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct CheckInForm {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    /// Screen size, e.g. `1080x2400`
    #[serde(rename = "WH")]
    pub width_height: String,
    #[serde(rename = "Aspect")]
    pub aspect_ratio: String,
    #[serde(rename = "OS")]
    pub operating_system: String,
    #[serde(rename = "Model")]
    pub model: String,
    /// One of `clientSP, clientComp, clientIOT, ctrlLite, ctrlPro, noneSP, noneComp`
    #[serde(rename = "Mode")]
    pub mode: String,
    #[serde(rename = "PrivateIP")]
    pub private_ip: String,
}

impl CheckInForm {
    pub fn into_check_in(self, public_ip: String) -> CheckIn {
        CheckIn {
            mode: DeviceMode::from_wire(&self.mode),
            id: self.id,
            name: self.name,
            width_height: self.width_height,
            aspect_ratio: self.aspect_ratio,
            operating_system: self.operating_system,
            model: self.model,
            public_ip,
            private_ip: self.private_ip,
        }
    }
}

/// Query of the discovery route.
#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[serde(default)]
pub struct DiscoveryQuery {
    /// ID of the requesting device; optional
    #[serde(rename = "ID")]
    pub id: String,
    /// Private IP the requester reports for itself
    #[serde(rename = "privateIP")]
    pub private_ip: String,
}

/// Decode a URL-encoded form. An empty body falls back to the query string.
fn decode_form<T: DeserializeOwned>(body: &[u8], query: Option<&str>) -> Result<T, QlightError> {
    let source = if body.iter().all(u8::is_ascii_whitespace) {
        query.unwrap_or_default().as_bytes()
    } else {
        body
    };
    serde_urlencoded::from_bytes(source).map_err(parse_error)
}

fn decode_check_in(
    body: &[u8],
    query: Option<&str>,
    client: ClientAddress,
) -> Result<CheckIn, QlightError> {
    let form: CheckInForm = decode_form(body, query)?;
    qualify_query(&form.id)?;
    // optional, but never stored with a forbidden character
    if !form.private_ip.is_empty() {
        qualify_query(&form.private_ip)?;
    }
    Ok(form.into_check_in(client.to_string()))
}

/// `GET /` banner
pub async fn banner_handler() -> String {
    format!("qlightAPI {VERSION}")
}

/// `POST /post/appInfo/`: create or update a device.
pub async fn check_in_handler(
    State(state): State<Arc<RegistryState>>,
    client: ClientAddress,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, QlightError> {
    let candidate = decode_check_in(&body, query.as_deref(), client)?;
    debug!(id = %candidate.id, %client, "check-in");

    let (record, outcome) = state.registry.check_in(candidate);
    log_api_call("postAppInfo", &record.id, outcome.status_text());
    Ok(ok_text(outcome.status_text()))
}

/// `PUT /put/appInfo/`: update a device that has checked in before.
pub async fn update_app_info_handler(
    State(state): State<Arc<RegistryState>>,
    client: ClientAddress,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, QlightError> {
    let candidate = decode_check_in(&body, query.as_deref(), client)?;
    let id = candidate.id.clone();

    match state.registry.update_existing(candidate) {
        Some(_) => {
            log_api_call("putAppInfo", &id, "Updated Entry");
            Ok(ok_text("Updated Entry"))
        }
        None => {
            log_api_call("putAppInfo", &id, "No Entry Found");
            Ok(negative_text("No Entry Found"))
        }
    }
}

/// `GET /get/controllerIP/`: find a controller on the caller's LAN.
pub async fn controller_ip_handler(
    State(state): State<Arc<RegistryState>>,
    client: ClientAddress,
    RawQuery(query): RawQuery,
) -> Result<Response, QlightError> {
    let params: DiscoveryQuery =
        serde_urlencoded::from_str(query.as_deref().unwrap_or_default()).map_err(parse_error)?;
    let requester_id = Some(params.id.as_str()).filter(|id| !id.is_empty());
    let public_ip = client.to_string();

    let resolution = state
        .registry
        .resolve(&public_ip, &params.private_ip, requester_id)?;

    let app_id = requester_id.unwrap_or("-");
    let response = match resolution {
        Resolution::Matched(ip) => {
            log_api_call("getControllerIP", app_id, "OK");
            ok_text(ip)
        }
        Resolution::NotFound => {
            log_api_call("getControllerIP", app_id, "Not Found");
            negative_text("Not Found")
        }
        Resolution::NoControllerOnPublicIp => {
            log_api_call("getControllerIP", app_id, "No LAN server");
            negative_text(format!("No LAN server found on IP\n{public_ip}"))
        }
    };
    Ok(response)
}
