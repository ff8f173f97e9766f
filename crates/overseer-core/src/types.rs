//! Core type definitions for the overseer collector

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plugin name every sample is dispatched under
pub const PLUGIN_NAME: &str = "solr";

/// Sample names, which double as plugin instance names
pub const LEADER: &str = "leader";
pub const OVERSEER_QUEUE_SIZE: &str = "overseer_queue_size";
pub const OVERSEER_WORK_QUEUE_SIZE: &str = "overseer_work_queue_size";
pub const OVERSEER_COLLECTION_QUEUE_SIZE: &str = "overseer_collection_queue_size";

/// Parsed reply of one status fetch.
///
/// Constructed per poll cycle and discarded after extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusDocument(Map<String, Value>);

impl StatusDocument {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value, returning `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Resolve a field path.
    ///
    /// A path starting with `/` is a JSON pointer; otherwise dotted segments
    /// walk nested objects (`responseHeader.status`).
    pub fn get(&self, path: &str) -> Option<&Value> {
        if path.starts_with('/') {
            let (head, rest) = match path[1..].split_once('/') {
                Some((head, rest)) => (head, Some(rest)),
                None => (&path[1..], None),
            };
            let head = head.replace("~1", "/").replace("~0", "~");
            let value = self.0.get(&head)?;
            return match rest {
                Some(rest) => value.pointer(&format!("/{}", rest)),
                None => Some(value),
            };
        }

        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Metric type of a dispatched sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Point-in-time value
    #[default]
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named value produced by extraction. The timestamp is taken by the
/// sink at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    pub kind: MetricKind,
}

impl MetricSample {
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            kind: MetricKind::Gauge,
        }
    }
}

/// How a field value becomes a sample value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Coerce the field to f64
    Identity,
    /// 1.0 if the local identity is a member of the field, else 0.0
    MembershipTest,
}

/// Maps one status field to one sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub sample_name: String,
    pub field: String,
    pub transform: Transform,
}

impl ExtractionRule {
    pub fn identity(sample_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            sample_name: sample_name.into(),
            field: field.into(),
            transform: Transform::Identity,
        }
    }

    pub fn membership(sample_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            sample_name: sample_name.into(),
            field: field.into(),
            transform: Transform::MembershipTest,
        }
    }
}

/// The fixed overseer rule set, in dispatch order.
///
/// Each queue metric is read from its own field.
pub fn overseer_rules() -> Vec<ExtractionRule> {
    vec![
        ExtractionRule::membership(LEADER, "leader"),
        ExtractionRule::identity(OVERSEER_QUEUE_SIZE, "overseer_queue_size"),
        ExtractionRule::identity(OVERSEER_WORK_QUEUE_SIZE, "overseer_work_queue_size"),
        ExtractionRule::identity(
            OVERSEER_COLLECTION_QUEUE_SIZE,
            "overseer_collection_queue_size",
        ),
    ]
}
