//! Poll loop for the Solr overseer collector.
//!
//! This crate drives [`PollCollector`] cycles on a fixed interval.
//!
//! # Features
//!
//! - **Immediate first tick**: the first cycle runs at start (configurable)
//! - **No overlap**: a cycle is awaited before the next tick is considered;
//!   ticks missed by a slow cycle collapse into one that fires when it ends
//! - **Fault isolation**: a failed fetch or sink only costs that cycle
//! - **Graceful shutdown**: `stop` lets the in-flight cycle finish
//!
//! # Example
//!
//! ```no_run
//! use overseer_core::ConfigBlock;
//! use overseer_daemon::CollectorDaemon;
//! use overseer_metrics::LoggingSink;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let block = ConfigBlock::new().with("Host", "solr-1").with("Interval", 10);
//! let daemon = CollectorDaemon::from_block(&block, Arc::new(LoggingSink))?;
//!
//! let summary = daemon
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//! println!("{} cycles", summary.cycles);
//! # Ok(())
//! # }
//! ```

mod scheduler;

pub use scheduler::{FirstTick, Scheduler, SchedulerConfig, SchedulerHandle};

use overseer_core::{Config, ConfigBlock, OverseerError, Result};
use overseer_metrics::{CollectorSummary, PollCollector, Sink};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// A configured collector together with its schedule
pub struct CollectorDaemon {
    collector: Arc<PollCollector>,
    schedule: SchedulerConfig,
}

impl CollectorDaemon {
    /// Validate `block` and wire up the collector.
    ///
    /// Invalid configuration is returned before any scheduler exists.
    pub fn from_block(block: &ConfigBlock, sink: Arc<dyn Sink>) -> Result<Self> {
        let config = Config::load(block)?;
        Self::new(config, sink)
    }

    pub fn new(config: Config, sink: Arc<dyn Sink>) -> Result<Self> {
        let config = Arc::new(config);
        let schedule = SchedulerConfig::from(config.as_ref());
        let collector = PollCollector::new(config, sink).map_err(OverseerError::Fetch)?;
        Ok(Self::with_collector(Arc::new(collector), schedule))
    }

    pub fn with_collector(collector: Arc<PollCollector>, schedule: SchedulerConfig) -> Self {
        Self {
            collector,
            schedule,
        }
    }

    pub fn with_first_tick(mut self, first_tick: FirstTick) -> Self {
        self.schedule.first_tick = first_tick;
        self
    }

    pub fn collector(&self) -> &Arc<PollCollector> {
        &self.collector
    }

    pub fn schedule(&self) -> SchedulerConfig {
        self.schedule
    }

    /// Start polling; returns the handle used to stop it
    pub fn start(&self) -> SchedulerHandle {
        spawn_collector(self.collector.clone(), self.schedule)
    }

    /// Poll until `shutdown` resolves, then stop gracefully
    pub async fn run_until<F>(self, shutdown: F) -> CollectorSummary
    where
        F: Future<Output = ()>,
    {
        let handle = self.start();
        info!(
            "Collecting from {}:{} every {:?}",
            self.collector.config().host,
            self.collector.config().port,
            self.schedule.period
        );

        shutdown.await;
        info!("Shutdown requested, waiting for in-flight cycle");
        handle.stop().await;

        let summary = self.collector.summary();
        info!(
            "Collector stopped: {} cycles, {} failed fetches, {} samples dispatched",
            summary.cycles, summary.failed_fetches, summary.samples_dispatched
        );
        summary
    }
}

/// Run `collector` cycles on `schedule`
pub fn spawn_collector(collector: Arc<PollCollector>, schedule: SchedulerConfig) -> SchedulerHandle {
    Scheduler::start(schedule, move || {
        let collector = collector.clone();
        async move {
            collector.run_cycle().await;
        }
    })
}
