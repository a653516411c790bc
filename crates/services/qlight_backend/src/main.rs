// File: services/qlight_backend/src/main.rs
use axum::Router;
use qlight_common::{config_error, logging, Context, QlightError};
use qlight_config::{env_vars::SECRET_MARKER, load_config};
use qlight_registry::{routes as registry_routes, DeviceRegistry, JsonFileSnapshot};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

mod bind;
mod console;

#[tokio::main]
async fn main() -> Result<(), QlightError> {
    let config = Arc::new(load_config().map_err(config_error)?);
    // held until exit so the file writer drains
    let _log_guard = logging::init_with_config(&config.logging);

    if let Some(auth) = &config.auth {
        if auth.key == SECRET_MARKER {
            return Err(config_error(
                "auth.key is not set; export QLIGHT_SECRET_AUTH_KEY or AUTH_KEY",
            ));
        }
    }

    let snapshot = Arc::new(JsonFileSnapshot::new(&config.storage.snapshot_path));
    info!(path = %snapshot.path().display(), "using registry snapshot");
    let (registry, writer_task) = DeviceRegistry::open(snapshot);
    let registry = Arc::new(registry);

    #[allow(unused_mut)] // for the features it needs to be mutable
    let mut app: Router = registry_routes(config.clone(), registry.clone());

    // Conditionally add Swagger UI and JSON endpoint if openapi feature enabled
    #[cfg(feature = "openapi")]
    {
        use qlight_registry::openapi::RegistryApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "qlight API",
                version = "0.1.0",
                description = "Device check-in and LAN controller discovery",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(RegistryApiDoc::openapi());
        info!("adding Swagger UI at /api/docs");

        let swagger_ui = SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc);
        app = app.merge(swagger_ui);
    }

    let app = app.layer(TraceLayer::new_for_http());

    let addr = bind::resolve_bind_addr(&config.server, bind::detect_outbound_ip);
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("failed to bind {addr}"))?;
    info!(%addr, "qlightAPI listening, type 'help' for console commands");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(console::spawn()))
    .await
    .context("server error")?;

    info!("server stopped, flushing registry");
    match registry.shutdown().await {
        Ok(outcome) => info!(?outcome, "final snapshot"),
        Err(err) => logging::log_error(err, "final snapshot failed"),
    }
    if let Err(err) = writer_task.await {
        error!(error = %err, "snapshot writer ended abnormally");
    }

    Ok(())
}

/// Resolve on console `quit` or ctrl-c.
async fn shutdown_signal(console: oneshot::Receiver<console::ConsoleExit>) {
    let console = async {
        match console.await {
            Ok(console::ConsoleExit::Quit) => {}
            // detached: leave shutdown to signals
            Ok(console::ConsoleExit::Closed) | Err(_) => std::future::pending::<()>().await,
        }
    };

    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
        info!("received ctrl-c, initiating graceful shutdown");
    };

    tokio::select! {
        _ = console => {},
        _ = ctrl_c => {},
    }
}
