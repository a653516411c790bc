#![allow(dead_code)]
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{CheckInForm, DiscoveryQuery};

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = String, example = "qlightAPI v0.1.0")
    ),
    tag = "Registry"
)]
fn doc_banner_handler() {}

#[utoipa::path(
    post,
    path = "/post/appInfo/",
    request_body(content = CheckInForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Device registered or updated", body = String,
         example = "OK:New Entry"),
        (status = 400, description = "Malformed form or invalid ID", body = String,
         example = "ERROR:Wrong data format, duplicate field `ID`"),
        (status = 401, description = "Missing or wrong credentials", body = String,
         example = "ERROR:Unauthorized")
    ),
    security(("basic_auth" = [])),
    tag = "Registry"
)]
fn doc_check_in_handler() {}

#[utoipa::path(
    put,
    path = "/put/appInfo/",
    request_body(content = CheckInForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Device updated, or `ERROR:No Entry Found` for an unknown ID",
         body = String, example = "OK:Updated Entry"),
        (status = 400, description = "Malformed form or invalid ID", body = String,
         example = "ERROR:empty query"),
        (status = 401, description = "Missing or wrong credentials", body = String,
         example = "ERROR:Unauthorized")
    ),
    security(("basic_auth" = [])),
    tag = "Registry"
)]
fn doc_update_app_info_handler() {}

#[utoipa::path(
    get,
    path = "/get/controllerIP/",
    params(DiscoveryQuery),
    responses(
        (status = 200, description = "`OK:<ip>` on a match, `ERROR:Not Found` or `ERROR:No LAN server found on IP` otherwise",
         body = String, example = "OK:192.168.1.9"),
        (status = 400, description = "Invalid privateIP or ID", body = String,
         example = "ERROR:empty query"),
        (status = 401, description = "Missing or wrong credentials", body = String,
         example = "ERROR:Unauthorized")
    ),
    security(("basic_auth" = [])),
    tag = "Registry"
)]
fn doc_controller_ip_handler() {}

struct BasicAuthScheme;

impl Modify for BasicAuthScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "basic_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        doc_banner_handler,
        doc_check_in_handler,
        doc_update_app_info_handler,
        doc_controller_ip_handler,
    ),
    components(schemas(CheckInForm)),
    modifiers(&BasicAuthScheme),
    tags(
        (name = "Registry", description = "Device check-in and LAN controller discovery")
    )
)]
pub struct RegistryApiDoc;
