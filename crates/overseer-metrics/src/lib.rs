//! # overseer-metrics
//!
//! Turns overseer status documents into gauge samples and dispatches them.
//!
//! This crate provides:
//! - [`MetricExtractor`]: typed field lookup and coercion per extraction rule
//! - [`Sink`] and reference sinks (no-op, logging, in-memory, JSON lines)
//! - [`PollCollector`]: one fetch, extract, dispatch cycle with running totals

mod collector;
mod extractor;
mod sink;

pub use collector::{CollectorSummary, CycleReport, PollCollector};
pub use extractor::{coerce_f64, is_member, MetricExtractor};
pub use sink::{DispatchRecord, JsonLinesSink, LoggingSink, MemorySink, NoopSink, Sink};
