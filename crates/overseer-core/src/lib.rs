//! # overseer-core
//!
//! Core types for the Solr overseer collector.
//!
//! The collector polls the Collections API `OVERSEERSTATUS` action of one
//! Solr node, turns a handful of fields into gauge samples and hands them to
//! a metrics sink on a fixed interval.
//!
//! ## Pieces
//!
//! - [`Config`] is loaded once from a [`ConfigBlock`] and never mutated
//! - [`StatusDocument`] is the parsed reply of one fetch
//! - [`ExtractionRule`]s map status fields to [`MetricSample`]s
//! - Errors follow a fatal/recoverable split: only [`ConfigError`] stops startup

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::{Config, ConfigBlock, ConfigNode, ConfigValue};
pub use error::{ConfigError, ExtractionError, FetchError, OverseerError, Result, SinkError};
pub use types::*;

/// Log a verbose line.
///
/// Emitted under the `overseer::verbose` target, at INFO when `enabled`
/// and demoted to DEBUG otherwise.
#[macro_export]
macro_rules! verbose {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            ::tracing::info!(target: "overseer::verbose", $($arg)+);
        } else {
            ::tracing::debug!(target: "overseer::verbose", $($arg)+);
        }
    };
}
