//! Error types for the impact client

use thiserror::Error;

/// Errors that escape to the caller.
///
/// Per-query failures (remote errors, network failures) never appear here;
/// they are recovered into a failed [`ImpactResponse`](crate::ImpactResponse).
#[derive(Debug, Error)]
pub enum CarbonError {
    #[error("Invalid input shape: {0}")]
    InvalidInputShape(String),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from the characteristic mapper
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("No mapping registered for type {type_name}")]
    Unregistered { type_name: &'static str },

    #[error("Invalid emitter name: {0:?}")]
    InvalidEmitter(String),
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid concurrency ceiling: {0} (must be at least 1)")]
    InvalidConcurrency(usize),

    #[error("Invalid duration for {field}: {reason}")]
    InvalidDuration { field: &'static str, reason: String },

    #[error("Invalid value for {var}: {value}")]
    InvalidEnvValue { var: &'static str, value: String },

    #[error("HTTP client could not be built: {0}")]
    HttpClient(String),
}

/// Errors raised by a [`Transport`](crate::ports::Transport).
///
/// The executor converts these into failed responses.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Timeout")]
    Timeout,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Invalid timeframe construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeframeError {
    #[error("Timeframe must end after it starts: {from} >= {to}")]
    Inverted { from: String, to: String },

    #[error("Year out of range: {0}")]
    YearOutOfRange(i32),
}

/// Result alias used across the crate
pub type CarbonResult<T> = Result<T, CarbonError>;
