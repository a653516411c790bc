//! Logging utilities for the qlight services.
//!
//! This module provides a standardized approach to logging across all crates:
//! a console `fmt` layer, an optional daily rolling log file, and a filter that
//! combines `RUST_LOG` with the configured level for the qlight crates.

use qlight_config::LoggingConfig;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name prefix of the rolling log file.
pub const LOG_FILE_PREFIX: &str = "qlight.log";

/// Initialize the tracing subscriber at INFO.
///
/// # Examples
///
/// ```
/// use qlight_common::logging;
///
/// logging::init();
/// ```
pub fn init() {
    let _ = init_with_config(&LoggingConfig::default());
}

/// Initialize the tracing subscriber with a specific log level and console output only.
pub fn init_with_level(level: Level) {
    install(level, None);
}

/// Initialize the tracing subscriber from the logging configuration.
///
/// An unparseable `level` falls back to INFO. When `directory` is set, events are also
/// written to a daily rolling file there; the returned guard must be kept alive for the
/// lifetime of the process, or buffered lines are lost on exit.
pub fn init_with_config(config: &LoggingConfig) -> Option<WorkerGuard> {
    let level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    install(level, config.directory.as_deref())
}

fn install(level: Level, directory: Option<&str>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    // try_init: a global subscriber may already be set (tests, embedding)
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .with(file_layer)
        .with(build_filter(level))
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
    guard
}

/// `RUST_LOG` directives plus `qlight=<level>` and `tower_http=<level>`.
pub fn build_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    ["qlight", "tower_http"]
        .iter()
        .fold(EnvFilter::from_default_env(), |filter, target| {
            match format!("{}={}", target, level).parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => filter,
            }
        })
}

/// Emit the structured record logged for every API call.
///
/// Carries the same facts the service has always logged per call: which
/// function ran, for which app ID, and with what status line.
pub fn log_api_call(function: &str, app_id: &str, status: &str) {
    info!(function, app_id, status, "api call");
}

/// Log an error with context at the ERROR level.
pub fn log_error<E: std::fmt::Display>(error: E, context: &str) {
    tracing::error!("{}: {}", context, error);
}
