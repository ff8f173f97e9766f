//! Unified error types for the overseer collector

use std::time::Duration;
use thiserror::Error;

/// Configuration errors. Fatal at load time: the scheduler must never start.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Config key {key} has no value")]
    MissingValue { key: String },

    #[error("Invalid value for {key}: {value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors fetching the remote status document. Recoverable: the cycle is
/// aborted and the next tick acts as the retry.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Status endpoint {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode status reply from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Status reply from {url} is not a JSON object")]
    NotAnObject { url: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Per-field extraction failures. The affected sample is omitted, the cycle
/// continues with partial output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Field not present: {0}")]
    MissingField(String),

    #[error("Field {field} is not numeric: {value}")]
    NotNumeric { field: String, value: String },
}

/// Sink failures. Logged and counted by the collector, never surfaced to the
/// scheduler.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink {sink} rejected sample {sample}: {reason}")]
    Rejected {
        sink: String,
        sample: String,
        reason: String,
    },
}

/// Unified error type for all collector operations
#[derive(Error, Debug)]
pub enum OverseerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using OverseerError
pub type Result<T> = std::result::Result<T, OverseerError>;
