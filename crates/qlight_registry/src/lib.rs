//! Device registry and LAN controller discovery for qlight
//!
//! Devices check in over HTTP with their identity, mode and private IP. The registry
//! keeps one record per device ID, persists the whole set to a JSON snapshot and, on
//! request, points a client at a controller that shares its public IP and subnet.
//!
//! # Features
//!
//! - In-memory record store guarded by a read/write lock
//! - Snapshot writes serialized through a single writer task
//! - First-match LAN discovery on the first three octets of the private IP
//! - Axum routes with optional HTTP basic auth
//! - OpenAPI/Swagger documentation (with the `openapi` feature)
//!
//! # Example
//!
//! ```rust,no_run
//! use qlight_config::AppConfig;
//! use qlight_registry::{routes, DeviceRegistry, JsonFileSnapshot};
//! use std::sync::Arc;
//!
//! async fn setup_app() {
//!     let config = Arc::new(AppConfig::default());
//!     let snapshot = Arc::new(JsonFileSnapshot::new(&config.storage.snapshot_path));
//!     let (registry, _writer) = DeviceRegistry::open(snapshot);
//!     let app = routes(config, Arc::new(registry));
//!     // Use the app with your Axum server
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - service banner
//! - `POST /post/appInfo/` - device check-in
//! - `PUT /put/appInfo/` - update a known device
//! - `GET /get/controllerIP/` - LAN controller discovery

pub mod auth;
#[cfg(feature = "openapi")]
pub mod doc;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod persistence;
pub mod registry;
pub mod resolver;
pub mod routes;
pub mod store;
pub mod writer;

pub use error::RegistryError;
pub use models::{CheckIn, DeviceMode, DeviceRecord};
pub use persistence::{JsonFileSnapshot, SaveOutcome, SnapshotRepository};
pub use registry::{CheckInOutcome, DeviceRegistry};
pub use resolver::Resolution;
// Re-export the routes function to be used by the main backend service
pub use routes::routes;

#[cfg(feature = "openapi")]
pub mod openapi {
    pub use crate::doc::RegistryApiDoc;
}
