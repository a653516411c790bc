//! Shared building blocks for the qlight services: the common error type and its
//! plain-text HTTP rendering, logging setup, and the query validation contract.

pub mod error; // Error handling
pub mod http; // HTTP response helpers
pub mod logging; // Logging utilities
pub mod validation; // Query value validation

// Re-export error types and utilities for easier access
pub use error::{config_error, parse_error, Context, HttpStatusCode, QlightError};

// Re-export HTTP utilities for easier access
pub use http::{error_text, negative_text, ok_text, IntoHttpResponse};

// Re-export logging utilities for easier access
pub use logging::{init, init_with_config, init_with_level, log_api_call, log_error};

pub use validation::{qualify_query, QueryRejection};
