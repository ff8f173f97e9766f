//! Metrics sinks
//!
//! A [`Sink`] receives every sample the collector produces. Dispatch is
//! fire-and-forget from the collector's point of view: errors are returned so
//! they can be logged and counted, but never stop a cycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use overseer_core::{MetricSample, SinkError, PLUGIN_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Destination for dispatched samples
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Hand one sample to the metrics backend
    async fn dispatch(&self, plugin_instance: &str, sample: &MetricSample)
        -> Result<(), SinkError>;
}

/// The value a backend receives for one sample, stamped at dispatch time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub plugin: String,
    pub plugin_instance: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub values: Vec<f64>,
    pub time: DateTime<Utc>,
}

impl DispatchRecord {
    pub fn new(plugin_instance: &str, sample: &MetricSample) -> Self {
        Self {
            plugin: PLUGIN_NAME.to_string(),
            plugin_instance: plugin_instance.to_string(),
            kind: sample.kind.as_str().to_string(),
            values: vec![sample.value],
            time: Utc::now(),
        }
    }
}

/// Discards every sample
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl Sink for NoopSink {
    fn name(&self) -> &str {
        "noop"
    }

    async fn dispatch(
        &self,
        _plugin_instance: &str,
        _sample: &MetricSample,
    ) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Logs every sample at INFO
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

#[async_trait]
impl Sink for LoggingSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn dispatch(&self, plugin_instance: &str, sample: &MetricSample) -> Result<(), SinkError> {
        info!(
            plugin = PLUGIN_NAME,
            plugin_instance,
            kind = %sample.kind,
            value = sample.value,
            "dispatched sample"
        );
        Ok(())
    }
}

/// Keeps every dispatched record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DispatchRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything dispatched so far
    pub fn records(&self) -> Vec<DispatchRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent value dispatched under `plugin_instance`
    pub fn last_value(&self, plugin_instance: &str) -> Option<f64> {
        self.records()
            .iter()
            .rev()
            .find(|r| r.plugin_instance == plugin_instance)
            .and_then(|r| r.values.first().copied())
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn dispatch(&self, plugin_instance: &str, sample: &MetricSample) -> Result<(), SinkError> {
        let record = DispatchRecord::new(plugin_instance, sample);
        let mut records = self.records.lock().map_err(|_| SinkError::Rejected {
            sink: "memory".to_string(),
            sample: sample.name.clone(),
            reason: "record buffer poisoned".to_string(),
        })?;
        records.push(record);
        Ok(())
    }
}

/// Appends one JSON [`DispatchRecord`] per line to a file
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every record written so far, skipping unparsable lines
    pub async fn load_all(&self) -> Result<Vec<DispatchRecord>, SinkError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let mut records = Vec::new();

        for line in content.lines() {
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<DispatchRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!("Failed to parse dispatch record line: {}", e);
                }
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl Sink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn dispatch(&self, plugin_instance: &str, sample: &MetricSample) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(&DispatchRecord::new(plugin_instance, sample))?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;

        debug!("Appended {} to {:?}", plugin_instance, self.path);
        Ok(())
    }
}
