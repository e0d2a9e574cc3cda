//! Venturi command-line harness
//!
//! Drives synthetic EEG through concurrent Venturi sessions and reports each
//! cycle, or checks a configuration file.
//!
//! # Usage
//!
//! ```bash
//! # Three simulated sessions with the default configuration
//! venturi simulate
//!
//! # Custom configuration, JSON lines on stdout
//! venturi simulate --config venturi.toml --sessions 8 --json
//!
//! # Lossy result queue with a slow consumer
//! venturi simulate --drop-oldest --result-capacity 16
//!
//! # Validate a configuration file
//! venturi check-config venturi.toml
//! ```

use std::collections::HashMap;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use venturi_core::config::SessionConfig;
use venturi_core::types::{EegSample, LearningStage, NeuralState};
use venturi_native::config::load_config;
use venturi_native::runtime::{BackpressurePolicy, RuntimeConfig, SessionEvent, SessionRuntime};

/// Venturi neuroadaptive EEG harness
#[derive(Parser, Debug)]
#[command(name = "venturi")]
#[command(author, version, about = "Neuroadaptive EEG processing harness", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run simulated sessions (default if no subcommand)
    Simulate {
        /// Configuration file; searched for if omitted, defaults if none found
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of concurrent sessions
        #[arg(short, long, default_value = "3")]
        sessions: usize,

        /// Samples fed to each session
        #[arg(short = 'n', long, default_value = "2048")]
        samples: u64,

        /// Print every result as a JSON line on stdout
        #[arg(long)]
        json: bool,

        /// Drop the oldest unread results instead of blocking sessions
        #[arg(long)]
        drop_oldest: bool,

        /// Result queue capacity
        #[arg(long, default_value = "1024")]
        result_capacity: usize,

        /// Pace samples at the configured sampling rate
        #[arg(long)]
        realtime: bool,
    },

    /// Load and validate a configuration file, printing the resolved values
    CheckConfig {
        /// Configuration file; searched for if omitted
        path: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Venturi v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        None => run_simulation(SimulationArgs::default()),
        Some(Commands::Simulate {
            config,
            sessions,
            samples,
            json,
            drop_oldest,
            result_capacity,
            realtime,
        }) => run_simulation(SimulationArgs {
            config,
            sessions,
            samples,
            json,
            drop_oldest,
            result_capacity,
            realtime,
        }),
        Some(Commands::CheckConfig { path }) => check_config(path),
    }
}

#[derive(Debug)]
struct SimulationArgs {
    config: Option<PathBuf>,
    sessions: usize,
    samples: u64,
    json: bool,
    drop_oldest: bool,
    result_capacity: usize,
    realtime: bool,
}

impl Default for SimulationArgs {
    fn default() -> Self {
        Self {
            config: None,
            sessions: 3,
            samples: 2048,
            json: false,
            drop_oldest: false,
            result_capacity: 1024,
            realtime: false,
        }
    }
}

/// Resolve the session configuration for a simulation
fn resolve_config(path: Option<&Path>) -> anyhow::Result<SessionConfig> {
    match path {
        Some(p) => Ok(load_config(Some(p))?),
        None => match load_config(None) {
            Ok(config) => Ok(config),
            Err(venturi_native::config::LoadError::FileNotFound(_)) => {
                info!("No configuration file found, using defaults");
                Ok(SessionConfig::default())
            }
            Err(e) => Err(e.into()),
        },
    }
}

fn check_config(path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(path.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    info!("Configuration is valid");
    Ok(())
}

/// Synthetic EEG whose engagement ramps up and back down over the run.
///
/// Each session gets its own phase offset so sessions move through states
/// at different times.
struct SyntheticEeg {
    sample_rate: f64,
    channels: usize,
    total: u64,
    phase: f64,
}

impl SyntheticEeg {
    fn sample(&self, i: u64) -> EegSample {
        let t = i as f64 / self.sample_rate;
        // 0 → 1 → 0 across the run
        let progress = (PI * (i as f64 / self.total.max(1) as f64) + self.phase).sin().abs();
        let beta = 2.0 + 18.0 * progress;
        let theta = 12.0 - 10.0 * progress;
        let alpha = 6.0;

        let channels: Vec<f64> = (0..self.channels)
            .map(|ch| {
                let offset = ch as f64 * 0.4;
                let noise = (i as f64 * 0.731 + offset * 3.1).sin() * 0.8;
                beta * (2.0 * PI * 21.0 * t + offset).sin()
                    + alpha * (2.0 * PI * 10.0 * t + offset).sin()
                    + theta * (2.0 * PI * 6.0 * t).sin()
                    + noise
            })
            .collect();

        EegSample::new((t * 1e6) as u64, channels)
    }
}

#[derive(Debug, Default)]
struct SessionSummary {
    degraded: u64,
    throttled: u64,
    errors: u64,
    stage: LearningStage,
    neural: NeuralState,
    score: f64,
}

fn run_simulation(args: SimulationArgs) -> anyhow::Result<()> {
    let config = resolve_config(args.config.as_deref())?;
    let runtime_config = RuntimeConfig {
        result_capacity: args.result_capacity,
        backpressure: if args.drop_oldest {
            BackpressurePolicy::DropOldest
        } else {
            BackpressurePolicy::Block
        },
        ..RuntimeConfig::default()
    };

    info!(
        sessions = args.sessions,
        samples = args.samples,
        sample_rate_hz = config.signal.sample_rate_hz,
        channels = config.signal.channel_count,
        window = config.signal.window_size,
        backpressure = ?runtime_config.backpressure,
        "Starting simulation"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(simulate(config, runtime_config, args))
}

async fn simulate(config: SessionConfig, runtime_config: RuntimeConfig, args: SimulationArgs) -> anyhow::Result<()> {
    let (runtime, mut results) = SessionRuntime::new(runtime_config);
    let period = Duration::from_secs_f64(1.0 / config.signal.sample_rate_hz);

    let mut producers = Vec::with_capacity(args.sessions);
    for k in 0..args.sessions {
        let handle = runtime.open(config.clone())?;
        let source = SyntheticEeg {
            sample_rate: config.signal.sample_rate_hz,
            channels: config.signal.channel_count,
            total: args.samples,
            phase: k as f64 * 0.7,
        };
        let samples = args.samples;
        let realtime = args.realtime;

        producers.push(tokio::spawn(async move {
            for i in 0..samples {
                handle.push(source.sample(i)).await?;
                if realtime {
                    tokio::time::sleep(period).await;
                }
            }
            handle.end().await
        }));
    }
    // Results end once every session task has released its sender
    drop(runtime);

    let mut summaries: HashMap<String, SessionSummary> = HashMap::new();
    while let Some(event) = results.recv().await {
        let id = event.session_id().to_string();
        let summary = summaries.entry(id.clone()).or_default();

        match event {
            SessionEvent::Cycle { result, .. } => {
                summary.degraded += u64::from(result.degraded);
                summary.throttled += u64::from(result.throttled);
                summary.stage = result.stage;
                summary.neural = result.neural_state;
                summary.score = result.trait_score;

                if args.json {
                    println!("{}", serde_json::json!({ "session": id, "result": result }));
                }
            }
            SessionEvent::Error { error, .. } => {
                summary.errors += 1;
                warn!(session = %id, kind = ?error.kind(), "{}", error);
            }
            SessionEvent::Ended { cycles, .. } => {
                info!(
                    session = %id,
                    cycles,
                    degraded = summary.degraded,
                    throttled = summary.throttled,
                    errors = summary.errors,
                    stage = summary.stage.name(),
                    neural = summary.neural.name(),
                    score = summary.score,
                    "Session summary"
                );
            }
        }
    }

    for producer in producers {
        if let Err(e) = producer.await? {
            error!("Session failed: {}", e);
        }
    }

    let dropped = results.dropped();
    if dropped > 0 {
        warn!(dropped, "Results dropped by the lossy queue");
    }
    info!(sessions = summaries.len(), "Simulation complete");
    Ok(())
}
