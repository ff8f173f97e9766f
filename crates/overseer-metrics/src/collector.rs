//! One fetch, extract, dispatch cycle

use overseer_client::StatusClient;
use overseer_core::fail_open::fail_open;
use overseer_core::{verbose, Config, FetchError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::extractor::MetricExtractor;
use crate::sink::Sink;

/// Outcome of a single poll cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Whether the status document was fetched
    pub fetched: bool,
    pub dispatched: usize,
    /// Rules that produced no sample
    pub omitted: usize,
    pub sink_failures: usize,
    pub elapsed: Duration,
}

/// Collects the overseer samples of one Solr node into a sink
pub struct PollCollector {
    config: Arc<Config>,
    client: StatusClient,
    extractor: MetricExtractor,
    sink: Arc<dyn Sink>,
    identity: String,
    cycles: AtomicU64,
    failed_fetches: AtomicU64,
    samples_dispatched: AtomicU64,
    samples_omitted: AtomicU64,
    sink_failures: AtomicU64,
}

impl PollCollector {
    /// Build the client, extractor and local identity from `config`
    pub fn new(config: Arc<Config>, sink: Arc<dyn Sink>) -> Result<Self, FetchError> {
        let client = StatusClient::new(&config)?;
        let extractor = MetricExtractor::new(config.verbose);
        let identity = config.local_identity();
        Ok(Self::from_parts(config, client, extractor, sink, identity))
    }

    pub fn from_parts(
        config: Arc<Config>,
        client: StatusClient,
        extractor: MetricExtractor,
        sink: Arc<dyn Sink>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            config,
            client,
            extractor,
            sink,
            identity: identity.into(),
            cycles: AtomicU64::new(0),
            failed_fetches: AtomicU64::new(0),
            samples_dispatched: AtomicU64::new(0),
            samples_omitted: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// Run one cycle. Never fails: fetch errors abort the cycle, extraction
    /// errors omit samples and sink errors are counted.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        self.cycles.fetch_add(1, Ordering::Relaxed);
        verbose!(self.config.verbose, "Poll cycle started ({})", self.client.status_url());

        let Some(doc) = fail_open("status fetch", || self.client.fetch()).await else {
            self.failed_fetches.fetch_add(1, Ordering::Relaxed);
            return CycleReport {
                fetched: false,
                dispatched: 0,
                omitted: 0,
                sink_failures: 0,
                elapsed: started.elapsed(),
            };
        };

        let samples = self.extractor.extract(&doc, &self.identity);
        let omitted = self.extractor.rules().len().saturating_sub(samples.len());

        let mut dispatched = 0;
        let mut sink_failures = 0;
        for sample in &samples {
            match self.sink.dispatch(&sample.name, sample).await {
                Ok(()) => dispatched += 1,
                Err(e) => {
                    warn!("Sink {} failed to dispatch {}: {}", self.sink.name(), sample.name, e);
                    sink_failures += 1;
                }
            }
        }

        self.samples_dispatched
            .fetch_add(dispatched as u64, Ordering::Relaxed);
        self.samples_omitted.fetch_add(omitted as u64, Ordering::Relaxed);
        self.sink_failures
            .fetch_add(sink_failures as u64, Ordering::Relaxed);

        let report = CycleReport {
            fetched: true,
            dispatched,
            omitted,
            sink_failures,
            elapsed: started.elapsed(),
        };
        verbose!(
            self.config.verbose,
            "Poll cycle complete: {} dispatched, {} omitted in {:?}",
            report.dispatched,
            report.omitted,
            report.elapsed
        );
        report
    }

    /// Totals since the collector was created
    pub fn summary(&self) -> CollectorSummary {
        CollectorSummary {
            cycles: self.cycles.load(Ordering::Relaxed),
            failed_fetches: self.failed_fetches.load(Ordering::Relaxed),
            samples_dispatched: self.samples_dispatched.load(Ordering::Relaxed),
            samples_omitted: self.samples_omitted.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }
}

/// Running totals of a collector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorSummary {
    pub cycles: u64,
    pub failed_fetches: u64,
    pub samples_dispatched: u64,
    pub samples_omitted: u64,
    pub sink_failures: u64,
}

impl CollectorSummary {
    pub fn fetch_success_rate(&self) -> f32 {
        if self.cycles == 0 {
            return 1.0;
        }
        let successful = self.cycles - self.failed_fetches;
        successful as f32 / self.cycles as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    #[test]
    fn test_summary_success_rate() {
        assert_eq!(CollectorSummary::default().fetch_success_rate(), 1.0);

        let summary = CollectorSummary {
            cycles: 4,
            failed_fetches: 1,
            ..Default::default()
        };
        assert_eq!(summary.fetch_success_rate(), 0.75);
    }

    #[tokio::test]
    async fn test_unreachable_node_dispatches_nothing() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = Arc::new(Config {
            host: "127.0.0.1".to_string(),
            port,
            verbose: false,
            identity: Some("host-a".to_string()),
            ..Config::default()
        });
        let sink = Arc::new(MemorySink::new());

        let collector = PollCollector::new(config, sink.clone()).unwrap();
        assert_eq!(collector.identity(), "host-a");

        let report = collector.run_cycle().await;
        assert!(!report.fetched);
        assert_eq!(report.dispatched, 0);
        assert!(sink.is_empty());

        let summary = collector.summary();
        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.failed_fetches, 1);
    }
}
