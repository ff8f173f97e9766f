//! Configuration loading for the overseer collector
//!
//! Raw configuration arrives as a [`ConfigBlock`]: an ordered list of
//! key/value nodes, either built programmatically or read from TOML. It is
//! validated once into an immutable [`Config`] that the client, collector
//! and scheduler share read-only.
//!
//! ```toml
//! [solr]
//! Host = "solr-1.internal"
//! Port = 8983
//! Status = "OVERSEERSTATUS"
//! Interval = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8983;
pub const DEFAULT_STATUS: &str = "OVERSEERSTATUS";
pub const DEFAULT_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const MAX_TIMEOUT_SECS: u64 = 60;
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// A single raw configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for ConfigValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u16> for ConfigValue {
    fn from(i: u16) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u64> for ConfigValue {
    fn from(i: u64) -> Self {
        Self::Integer(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// One `Key value...` entry of a configuration block
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    pub key: String,
    pub values: Vec<ConfigValue>,
}

/// Ordered key/value configuration as supplied by the operator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigBlock {
    nodes: Vec<ConfigNode>,
    /// Keys read but not used, e.g. top-level keys next to a `[solr]` table
    ignored: Vec<String>,
}

impl ConfigBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single-valued node
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.nodes.push(ConfigNode {
            key: key.into(),
            values: vec![value.into()],
        });
    }

    /// Append a node with any number of values (including none)
    pub fn push_node(&mut self, node: ConfigNode) {
        self.nodes.push(node);
    }

    /// Builder-style [`push`](Self::push)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.push(key, value);
        self
    }

    /// Append every node of `other`, so its values win over earlier ones
    pub fn extend(&mut self, other: ConfigBlock) {
        self.nodes.extend(other.nodes);
        self.ignored.extend(other.ignored);
    }

    pub fn nodes(&self) -> &[ConfigNode] {
        &self.nodes
    }

    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parse a TOML document.
    ///
    /// Keys are read from a `[solr]` table when one exists, otherwise from
    /// the top level. With a `[solr]` table, other top-level keys are
    /// recorded as ignored. Arrays become multi-valued nodes; nested tables
    /// become nodes without values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let solr = table
            .iter()
            .find(|(key, value)| key.eq_ignore_ascii_case("solr") && value.is_table());

        let mut block = Self::new();
        let section = match solr {
            Some((solr_key, value)) => {
                block.ignored = table
                    .keys()
                    .filter(|key| *key != solr_key)
                    .cloned()
                    .collect();
                value.as_table().unwrap_or(&table)
            }
            None => &table,
        };

        for (key, value) in section {
            let values = match value {
                toml::Value::Array(items) => items.iter().filter_map(toml_scalar).collect(),
                other => toml_scalar(other).into_iter().collect(),
            };
            block.push_node(ConfigNode {
                key: key.clone(),
                values,
            });
        }
        Ok(block)
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }
}

fn toml_scalar(value: &toml::Value) -> Option<ConfigValue> {
    match value {
        toml::Value::String(s) => Some(ConfigValue::String(s.clone())),
        toml::Value::Integer(i) => Some(ConfigValue::Integer(*i)),
        toml::Value::Float(v) => Some(ConfigValue::Float(*v)),
        toml::Value::Boolean(b) => Some(ConfigValue::Boolean(*b)),
        toml::Value::Datetime(dt) => Some(ConfigValue::String(dt.to_string())),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

/// Validated collector configuration.
///
/// Built once by [`Config::load`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Collections API action, e.g. `OVERSEERSTATUS`
    pub status: String,
    pub interval_secs: u64,
    pub verbose: bool,
    /// Bound on a single status fetch
    pub timeout_secs: u64,
    /// Override for the identity tested against the overseer leader
    pub identity: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            status: DEFAULT_STATUS.to_string(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            verbose: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            identity: None,
        }
    }
}

impl Config {
    /// Validate a configuration block.
    ///
    /// Unknown keys are logged and skipped. Any invalid value aborts loading.
    pub fn load(block: &ConfigBlock) -> Result<Self, ConfigError> {
        let (config, unknown) = Self::load_with_warnings(block)?;
        for key in &unknown {
            warn!("Unknown config key: {}", key);
        }
        crate::verbose!(
            config.verbose,
            "Configured: host={}, port={}, status={}, interval={}",
            config.host,
            config.port,
            config.status,
            config.interval_secs
        );
        Ok(config)
    }

    /// Like [`load`](Self::load) but returns unknown keys instead of logging them
    pub fn load_with_warnings(block: &ConfigBlock) -> Result<(Self, Vec<String>), ConfigError> {
        let mut config = Self::default();
        let mut unknown = block.ignored().to_vec();

        for node in block.nodes() {
            let key = node.key.as_str();
            match key.to_ascii_lowercase().as_str() {
                "host" => config.host = parse_name(key, first_value(node)?)?,
                "port" => config.port = parse_port(key, first_value(node)?)?,
                "status" => config.status = parse_name(key, first_value(node)?)?,
                "interval" => {
                    config.interval_secs =
                        parse_seconds(key, first_value(node)?, MAX_INTERVAL_SECS)?
                }
                "timeout" => {
                    config.timeout_secs =
                        parse_seconds(key, first_value(node)?, MAX_TIMEOUT_SECS)?
                }
                "verbose" => config.verbose = parse_bool(key, first_value(node)?)?,
                "identity" => config.identity = Some(parse_name(key, first_value(node)?)?),
                _ => unknown.push(node.key.clone()),
            }
        }

        Ok((config, unknown))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Identity tested for overseer leadership: the configured override or
    /// the machine hostname.
    pub fn local_identity(&self) -> String {
        if let Some(identity) = &self.identity {
            return identity.clone();
        }
        identity_from_hostname(hostname::get())
    }
}

fn identity_from_hostname(name: std::io::Result<std::ffi::OsString>) -> String {
    match name {
        Ok(name) => {
            let name = name.to_string_lossy();
            let name = name.trim();
            if name.is_empty() {
                warn!("Local hostname is empty");
                "unknown".to_string()
            } else {
                name.to_string()
            }
        }
        Err(e) => {
            warn!("Failed to resolve local hostname: {}", e);
            "unknown".to_string()
        }
    }
}

fn first_value(node: &ConfigNode) -> Result<&ConfigValue, ConfigError> {
    node.values.first().ok_or_else(|| ConfigError::MissingValue {
        key: node.key.clone(),
    })
}

fn parse_name(key: &str, value: &ConfigValue) -> Result<String, ConfigError> {
    let text = value.to_string();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid(key, value, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn parse_port(key: &str, value: &ConfigValue) -> Result<u16, ConfigError> {
    let port = match value {
        ConfigValue::Integer(i) => *i,
        ConfigValue::Float(v) if v.fract() == 0.0 => *v as i64,
        ConfigValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::invalid(key, value, "not an integer"))?,
        _ => return Err(ConfigError::invalid(key, value, "not an integer")),
    };

    if !(1..=i64::from(u16::MAX)).contains(&port) {
        return Err(ConfigError::invalid(key, value, "must be between 1 and 65535"));
    }
    Ok(port as u16)
}

/// Positive number of seconds, truncated toward zero, at least 1
fn parse_seconds(key: &str, value: &ConfigValue, max: u64) -> Result<u64, ConfigError> {
    let secs = match value {
        ConfigValue::Integer(i) => *i as f64,
        ConfigValue::Float(v) => *v,
        ConfigValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::invalid(key, value, "not a number"))?,
        ConfigValue::Boolean(_) => return Err(ConfigError::invalid(key, value, "not a number")),
    };

    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::invalid(key, value, "must be a positive number of seconds"));
    }

    let whole = secs.trunc();
    if whole < 1.0 {
        return Err(ConfigError::invalid(key, value, "must be at least 1 second"));
    }
    if whole > max as f64 {
        return Err(ConfigError::invalid(
            key,
            value,
            format!("must be at most {} seconds", max),
        ));
    }
    Ok(whole as u64)
}

fn parse_bool(key: &str, value: &ConfigValue) -> Result<bool, ConfigError> {
    match value {
        ConfigValue::Boolean(b) => Ok(*b),
        ConfigValue::Integer(0) => Ok(false),
        ConfigValue::Integer(1) => Ok(true),
        ConfigValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(ConfigError::invalid(key, value, "not a boolean")),
        },
        _ => Err(ConfigError::invalid(key, value, "not a boolean")),
    }
}
