//! Posture Monitor CLI
//!
//! Replays per-frame face measurements through the monitoring engine and
//! prints debounced alerts as JSON lines.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossbeam_channel::{never, select, tick, Receiver};
use posture_monitor::{
    config::Config, JsonLinesSink, LogSink, Monitor, ReplaySource, Sample, TickSource,
    ALERT_GUIDE, VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "posture-monitor")]
#[command(version = VERSION)]
#[command(about = "Posture and blink-rate monitor with debounced alerts", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor over a stream of JSON-lines samples
    Run {
        /// Sample file, or `-` for stdin
        #[arg(long, short, default_value = "-")]
        input: String,

        /// Tick minute buckets from the wall clock instead of sample timestamps
        #[arg(long)]
        wall_clock: bool,

        /// Log a status line every N frames (0 disables)
        #[arg(long, default_value = "10")]
        status_every: u64,
    },

    /// Describe the alerts the monitor can raise
    Alerts,

    /// Show configuration
    Config {
        /// Write the default configuration to the config file
        #[arg(long)]
        init: bool,
    },

    /// Validate a configuration file
    Check,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            wall_clock,
            status_every,
        } => cmd_run(cli.config, &input, wall_clock, status_every),
        Commands::Alerts => {
            println!("{ALERT_GUIDE}");
            Ok(())
        }
        Commands::Config { init } => cmd_config(init),
        Commands::Check => cmd_check(cli.config),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(&path)
            .with_context(|| format!("could not load configuration from {path:?}"))?,
        None => Config::load().context("could not load configuration")?,
    };
    Ok(config)
}

fn cmd_run(
    config_path: Option<PathBuf>,
    input: &str,
    wall_clock: bool,
    status_every: u64,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let bucket_period = config.rate.bucket_period;
    let ticks = if wall_clock {
        TickSource::External
    } else {
        TickSource::Samples
    };

    let mut monitor = Monitor::new(config, ticks, (LogSink, JsonLinesSink::stdout()))?;
    let mut source =
        ReplaySource::open(input).with_context(|| format!("could not open input {input:?}"))?;

    tracing::info!("Posture Monitor v{}", VERSION);
    tracing::info!(
        input,
        ticks = if wall_clock { "wall clock" } else { "sample timestamps" },
        "Starting monitor"
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("could not set Ctrl+C handler")?;

    source.start()?;
    let samples: Receiver<Sample> = source.receiver().clone();
    let ticker = if wall_clock {
        tick(bucket_period)
    } else {
        never()
    };

    let mut frames: u64 = 0;
    let mut last_timestamp = None;
    let started = Instant::now();

    while running.load(Ordering::SeqCst) {
        select! {
            recv(samples) -> msg => match msg {
                Ok(sample) => {
                    if !monitor.is_running() {
                        monitor.start(sample.timestamp_ms);
                    }
                    let observation = monitor.process(&sample);
                    frames += 1;
                    last_timestamp = Some(sample.timestamp_ms);

                    if status_every > 0 && frames % status_every == 0 {
                        let status = monitor.status(sample.timestamp_ms);
                        tracing::info!(
                            frame = frames,
                            face = status.face_detected,
                            face_size = ?status.face_size,
                            posture = ?observation.posture,
                            alert = ?status.posture_alert,
                            blinks = status.total_blinks,
                            "Status"
                        );
                    }
                }
                Err(_) => {
                    tracing::info!("Input exhausted");
                    break;
                }
            },
            recv(ticker) -> _ => {
                // Ticks land on the recording's timeline, not the epoch.
                if monitor.is_running() {
                    monitor.tick_at(Instant::now());
                }
            },
            default(Duration::from_millis(200)) => {}
        }
    }

    source.stop();
    if source.malformed_lines() > 0 {
        tracing::warn!(lines = source.malformed_lines(), "Skipped malformed input lines");
    }

    let end = if wall_clock {
        monitor.sample_time_at(Instant::now())
    } else {
        last_timestamp
    };
    let status = monitor.status(end.unwrap_or_default());
    let stats = monitor.stats();
    monitor.stop();

    eprintln!();
    eprintln!(
        "Processed {} frames in {:.1}s",
        frames,
        started.elapsed().as_secs_f64()
    );
    if status.running {
        eprintln!(
            "Blink rate: {:.1}/min over {} minute(s)",
            status.blink_stats.avg_per_minute, status.blink_stats.minute_count
        );
    }
    eprintln!("{}", stats.summary());
    Ok(())
}

fn cmd_config(init: bool) -> anyhow::Result<()> {
    if init {
        let path = Config::default().save()?;
        println!("Wrote default configuration to {path:?}");
        return Ok(());
    }

    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_check(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(Config::config_path);
    let config = Config::load_from(&path).with_context(|| format!("could not load {path:?}"))?;
    config.validate()?;
    println!("{path:?}: configuration is valid");
    Ok(())
}
