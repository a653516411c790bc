use std::fmt;
use thiserror::Error;

use crate::validation::QueryRejection;

/// The base error type for all qlight errors.
///
/// Each crate can extend this by implementing `From<SpecificError> for QlightError`.
/// The `Display` text is what the client sees after the `ERROR:` prefix.
#[derive(Error, Debug)]
pub enum QlightError {
    /// The request body could not be decoded
    #[error("Wrong data format, {0}")]
    ParseError(String),

    /// A query value failed the input validation contract
    #[error("{0}")]
    ValidationError(#[from] QueryRejection),

    /// Missing or wrong credentials
    #[error("Unauthorized")]
    AuthError(String),

    /// Snapshot could not be read or written
    #[error("Persistence failure: {0}")]
    PersistenceError(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Anything else
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for QlightError {
    fn status_code(&self) -> u16 {
        match self {
            QlightError::ParseError(_) => 400,
            QlightError::ValidationError(_) => 400,
            QlightError::AuthError(_) => 401,
            QlightError::PersistenceError(_) => 500,
            QlightError::ConfigError(_) => 500,
            QlightError::InternalError(_) => 500,
        }
    }
}

/// A trait for adding context to errors.
pub trait Context<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, QlightError>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, QlightError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| QlightError::InternalError(format!("{}: {}", context, error)))
    }
}

impl From<serde_json::Error> for QlightError {
    fn from(err: serde_json::Error) -> Self {
        QlightError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for QlightError {
    fn from(err: std::io::Error) -> Self {
        QlightError::PersistenceError(err.to_string())
    }
}

pub fn parse_error<T: fmt::Display>(message: T) -> QlightError {
    QlightError::ParseError(message.to_string())
}

pub fn config_error<T: fmt::Display>(message: T) -> QlightError {
    QlightError::ConfigError(message.to_string())
}
