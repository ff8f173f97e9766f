//! Fixed-interval tick loop
//!
//! Each tick's work is awaited inside the loop, so cycles never overlap. A
//! cycle that outlasts the period collapses the missed ticks into one that
//! fires as soon as it ends; the tick after that is a full period later, so
//! cycle starts are never closer than one period.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Shortest period the scheduler accepts
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Longest period the scheduler accepts
const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// When the first tick fires
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FirstTick {
    /// Right after start
    #[default]
    Immediate,
    /// One period after start
    AfterInterval,
}

/// Configuration for the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between tick starts.
    /// Zero is raised to 1ms, anything over a year is lowered to a year.
    pub period: Duration,

    /// Default: immediate
    pub first_tick: FirstTick,
}

impl SchedulerConfig {
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            first_tick: FirstTick::Immediate,
        }
    }

    pub fn with_first_tick(mut self, first_tick: FirstTick) -> Self {
        self.first_tick = first_tick;
        self
    }
}

impl From<&overseer_core::Config> for SchedulerConfig {
    fn from(config: &overseer_core::Config) -> Self {
        Self::every(config.interval())
    }
}

/// Runs a tick callback on a fixed period
pub struct Scheduler;

impl Scheduler {
    /// Spawn the tick loop on the current runtime.
    ///
    /// `on_tick` is awaited to completion before the next tick is considered.
    pub fn start<F, Fut>(config: SchedulerConfig, mut on_tick: F) -> SchedulerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = config.period.clamp(MIN_PERIOD, MAX_PERIOD);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let ticks = Arc::new(AtomicU64::new(0));
        let tick_counter = ticks.clone();

        let join = tokio::spawn(async move {
            let now = Instant::now();
            let start = match config.first_tick {
                FirstTick::Immediate => now,
                FirstTick::AfterInterval => now.checked_add(period).unwrap_or(now),
            };
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!("Scheduler started (period {:?}, first tick {:?})", period, config.first_tick);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        debug!("Scheduler received shutdown signal");
                        break;
                    }
                    _ = interval.tick() => {
                        on_tick().await;
                        tick_counter.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }

            info!(
                "Scheduler stopped after {} ticks",
                tick_counter.load(Ordering::Relaxed)
            );
        });

        SchedulerHandle {
            shutdown_tx,
            join,
            ticks,
        }
    }
}

/// Handle to a running tick loop.
///
/// Dropping the handle also stops the loop once any in-flight tick finishes.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
    ticks: Arc<AtomicU64>,
}

impl SchedulerHandle {
    /// Completed ticks so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancel future ticks and wait for the in-flight one, if any.
    ///
    /// Returns the number of completed ticks.
    pub async fn stop(self) -> u64 {
        // A full channel means a stop is already pending
        let _ = self.shutdown_tx.try_send(());

        if let Err(e) = self.join.await {
            error!("Scheduler task ended abnormally: {}", e);
        }
        self.ticks.load(Ordering::Relaxed)
    }
}
