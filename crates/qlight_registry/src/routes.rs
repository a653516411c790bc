use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use qlight_config::AppConfig;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{basic_auth_middleware, BasicAuthState};
use crate::handlers::{
    banner_handler, check_in_handler, controller_ip_handler, update_app_info_handler,
    RegistryState,
};
use crate::registry::DeviceRegistry;

/// Build the device API router.
///
/// The banner at `/` is public. The `/post`, `/put` and `/get` routes require basic
/// auth when `auth` is configured.
///
/// # Arguments
///
/// * `config` - application configuration (auth credentials, proxy trust)
/// * `registry` - the registry shared with the rest of the process
pub fn routes(config: Arc<AppConfig>, registry: Arc<DeviceRegistry>) -> Router {
    let state = Arc::new(RegistryState {
        registry,
        trust_forwarded_for: config.server.trust_forwarded_for,
    });

    let auth_state = Arc::new(BasicAuthState {
        credentials: config.auth.clone(),
    });
    if auth_state.credentials.is_none() {
        warn!("no auth configured, device API is open");
    }

    let api = Router::new()
        .route("/post/appInfo/", post(check_in_handler))
        .route("/put/appInfo/", put(update_app_info_handler))
        .route("/get/controllerIP/", get(controller_ip_handler))
        .route_layer(middleware::from_fn_with_state(
            auth_state,
            basic_auth_middleware,
        ));

    info!("registry routes initialized");

    Router::new()
        .route("/", get(banner_handler))
        .merge(api)
        .with_state(state)
}
