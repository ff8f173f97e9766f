//! Overseer collector CLI - Solr overseer status as gauge metrics
//!
//! Usage:
//!   overseer-collector run                 Poll until Ctrl-C (default)
//!   overseer-collector once                Run a single cycle and print the samples
//!   overseer-collector check               Validate configuration and print it

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use overseer_core::{Config, ConfigBlock};
use overseer_daemon::{CollectorDaemon, FirstTick};
use overseer_metrics::{JsonLinesSink, LoggingSink, MemorySink, NoopSink, PollCollector, Sink};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "overseer-collector")]
#[command(author, version, about = "Poll Solr overseer status and dispatch gauge metrics")]
struct Cli {
    /// Configuration file (TOML, keys at top level or in a [solr] table)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Settings that override the configuration file
#[derive(Args)]
struct Overrides {
    /// Solr host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Solr port
    #[arg(long, global = true)]
    port: Option<String>,

    /// Collections API status action
    #[arg(long, global = true)]
    status: Option<String>,

    /// Seconds between polls
    #[arg(long, global = true)]
    interval: Option<String>,

    /// Seconds before a status fetch is abandoned
    #[arg(long, global = true)]
    timeout: Option<String>,

    /// Identity tested against the overseer leader (default: hostname)
    #[arg(long, global = true)]
    identity: Option<String>,

    /// Disable verbose logging
    #[arg(short, long, global = true)]
    quiet: bool,
}

impl Overrides {
    fn into_block(self) -> ConfigBlock {
        let mut block = ConfigBlock::new();
        let pairs = [
            ("Host", self.host),
            ("Port", self.port),
            ("Status", self.status),
            ("Interval", self.interval),
            ("Timeout", self.timeout),
            ("Identity", self.identity),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                block.push(key, value);
            }
        }
        if self.quiet {
            block.push("Verbose", false);
        }
        block
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Poll on the configured interval until interrupted
    Run {
        /// Where samples are dispatched
        #[arg(long, value_enum, default_value = "log")]
        sink: SinkKind,

        /// Output file for the jsonl sink
        #[arg(long, value_name = "FILE", default_value = "overseer-samples.jsonl")]
        output: PathBuf,

        /// Wait one interval before the first poll
        #[arg(long)]
        delay_first: bool,
    },

    /// Run a single poll cycle and print the samples as JSON
    Once,

    /// Validate configuration and print the effective settings
    Check,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SinkKind {
    Log,
    Noop,
    Jsonl,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut block = match &cli.config {
        Some(path) => ConfigBlock::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConfigBlock::new(),
    };
    block.extend(cli.overrides.into_block());

    match cli.command.unwrap_or(Commands::Run {
        sink: SinkKind::Log,
        output: PathBuf::from("overseer-samples.jsonl"),
        delay_first: false,
    }) {
        Commands::Run {
            sink,
            output,
            delay_first,
        } => cmd_run(&block, sink, output, delay_first).await,
        Commands::Once => cmd_once(&block).await,
        Commands::Check => cmd_check(&block),
    }
}

async fn cmd_run(block: &ConfigBlock, kind: SinkKind, output: PathBuf, delay_first: bool) -> Result<()> {
    let sink: Arc<dyn Sink> = match kind {
        SinkKind::Log => Arc::new(LoggingSink),
        SinkKind::Noop => Arc::new(NoopSink),
        SinkKind::Jsonl => {
            info!("Writing samples to {}", output.display());
            Arc::new(JsonLinesSink::new(output))
        }
    };

    let mut daemon = CollectorDaemon::from_block(block, sink).context("Invalid configuration")?;
    if delay_first {
        daemon = daemon.with_first_tick(FirstTick::AfterInterval);
    }

    let summary = daemon
        .run_until(wait_for_shutdown(tokio::signal::ctrl_c()))
        .await;

    println!(
        "Stopped after {} cycles ({} failed fetches, {} samples dispatched, {} sink failures)",
        summary.cycles, summary.failed_fetches, summary.samples_dispatched, summary.sink_failures
    );
    Ok(())
}

/// Resolve when `signal` fires. A signal that cannot be installed never
/// resolves, so polling continues until the process is killed.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Failed to listen for Ctrl-C, polling until killed: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn cmd_once(block: &ConfigBlock) -> Result<()> {
    let config = Arc::new(Config::load(block).context("Invalid configuration")?);
    let sink = Arc::new(MemorySink::new());
    let collector = PollCollector::new(config, sink.clone()).context("Failed to build status client")?;

    let report = collector.run_cycle().await;
    if !report.fetched {
        bail!("Status fetch from {}:{} failed", collector.config().host, collector.config().port);
    }

    let output = serde_json::json!({
        "identity": collector.identity(),
        "report": report,
        "samples": sink.records(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_check(block: &ConfigBlock) -> Result<()> {
    let (config, unknown) = Config::load_with_warnings(block).context("Invalid configuration")?;

    for key in &unknown {
        println!("warning: unknown config key: {}", key);
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("local identity: {}", config.local_identity());
    Ok(())
}
