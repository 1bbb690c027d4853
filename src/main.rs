//! TrainLog - Athletic Training Log
//!
//! Headless entry point: record sessions and print trends from a terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trainlog::metrics::trends::SeriesPoint;
use trainlog::storage::config::{get_config_path, load_config, load_config_from, save_config_to};
use trainlog::{AppConfig, Metric, RawFields, RecordStore, TrainingLog};

#[derive(Parser, Debug)]
#[command(author, version, about = "Athletic training log", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform data directory)
    #[arg(long, global = true, env = "TRAINLOG_CONFIG", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record one training session
    Log(LogArgs),
    /// Print every stored entry
    Rows,
    /// Per-player summary
    Summary,
    /// One player's series for a metric
    Series {
        #[arg(long)]
        player: String,
        #[arg(long, default_value = "rpe")]
        metric: Metric,
    },
    /// Every player's series for a metric
    Compare {
        #[arg(long, default_value = "jump_height")]
        metric: Metric,
    },
    /// Daily condition report for one player
    Report {
        #[arg(long)]
        player: String,
    },
    /// Show the roster, optionally adding a player
    Roster {
        #[arg(long)]
        add: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct LogArgs {
    #[arg(long)]
    player: String,
    /// Strength, Power or Maintenance
    #[arg(long)]
    phase: String,
    /// Perceived exertion (1-10)
    #[arg(long)]
    rpe: Option<i64>,
    /// Pain (0-10)
    #[arg(long)]
    pain: Option<i64>,
    #[arg(long)]
    note: Option<String>,
    /// Jump height in cm
    #[arg(long)]
    jump_height: Option<f64>,
    /// Peak force in N
    #[arg(long)]
    peak_force: Option<f64>,
    /// Time to peak force in ms
    #[arg(long)]
    ttpf: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(get_config_path);
    let mut config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .with_context(|| format!("loading {}", config_path.display()))?;

    tracing::debug!("Starting TrainLog v{}", env!("CARGO_PKG_VERSION"));

    if let Command::Roster { add } = &cli.command {
        if let Some(player) = add {
            if config.roster.add(player) {
                save_config_to(&config, &config_path)?;
                tracing::info!(player = %player.trim(), "Added to roster");
            }
        }
        for player in config.roster.iter() {
            println!("{}", player);
        }
        return Ok(());
    }

    // Built outside the runtime; the HTTP backend owns a blocking client.
    let backend = config.open_backend()?;
    let store = RecordStore::new(Arc::clone(&backend), config.store_settings());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let result = runtime.block_on(run(cli.command, &config, store));

    drop(runtime);
    drop(backend);
    result
}

async fn run(command: Command, config: &AppConfig, store: RecordStore) -> Result<()> {
    let log = TrainingLog::from_config(config, store);
    let outcome = execute(&log, command, config).await;
    log.close().await;
    outcome
}

async fn execute(log: &TrainingLog, command: Command, config: &AppConfig) -> Result<()> {
    match command {
        Command::Log(args) => {
            if !config.roster.contains(&args.player) {
                tracing::warn!(player = %args.player, "Player is not on the roster");
            }
            let raw = RawFields {
                player_id: args.player,
                phase: args.phase,
                rpe: args.rpe,
                pain: args.pain,
                note: args.note,
                jump_height_cm: args.jump_height,
                peak_force_n: args.peak_force,
                ttpf_ms: args.ttpf,
            };
            let entry = log.submit(raw).await?;
            println!(
                "Saved {} ({}) at {}",
                entry.player_id,
                entry.phase,
                entry.timestamp.format("%Y-%m-%d %H:%M:%S")
            );
        }
        Command::Rows => {
            let snapshot = log.snapshot().await?;
            for entry in &snapshot.entries {
                println!(
                    "{}  {:<10} {:<12} rpe={:<3} pain={:<3} jump={:<6} force={:<7} ttpf={:<6} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.player_id,
                    entry.phase,
                    opt(entry.rpe.map(f64::from)),
                    opt(entry.pain.map(f64::from)),
                    opt(entry.jump_height_cm),
                    opt(entry.peak_force_n),
                    opt(entry.ttpf_ms),
                    entry.note.as_deref().unwrap_or("")
                );
            }
            if !snapshot.skipped.is_empty() {
                tracing::warn!(count = snapshot.skipped.len(), "Malformed rows were skipped");
            }
        }
        Command::Summary => {
            println!(
                "{:<10} {:>5} {:>8} {:>9} {:>9} {:>10} {:>9}",
                "player", "n", "rpe", "pain", "jump", "force", "ttpf"
            );
            for (player, s) in log.summary().await? {
                println!(
                    "{:<10} {:>5} {:>8} {:>9} {:>9} {:>10} {:>9}",
                    player,
                    s.count,
                    opt(s.mean_rpe),
                    opt(s.mean_pain),
                    opt(s.max_jump_height_cm),
                    opt(s.max_peak_force_n),
                    opt(s.min_ttpf_ms)
                );
            }
        }
        Command::Series { player, metric } => {
            print_series(&log.series(&player, metric).await?);
        }
        Command::Compare { metric } => {
            for (player, points) in log.compare(metric).await? {
                println!("# {} ({}{})", player, metric, unit_suffix(metric));
                print_series(&points);
            }
        }
        Command::Report { player } => {
            let report = log.condition_report(&player).await?;
            if report.is_empty() {
                println!("No entries for {}", player);
                return Ok(());
            }
            println!("{} condition report", player);
            println!("{:<10} {:>8} {:>6} {:>6}", "date", "sessions", "rpe", "pain");
            for day in &report {
                println!(
                    "{:<10} {:>8} {:>6} {:>6}",
                    day.date.to_string(),
                    day.sessions,
                    opt(day.mean_rpe),
                    opt(day.mean_pain)
                );
            }
            if let Some(latest) = log.latest(&player).await? {
                println!(
                    "latest: {} ({}) rpe={} pain={}",
                    latest.timestamp.format("%Y-%m-%d %H:%M"),
                    latest.phase,
                    opt(latest.rpe.map(f64::from)),
                    opt(latest.pain.map(f64::from))
                );
            }
        }
        // Handled in main before the store is opened
        Command::Roster { .. } => unreachable!("roster is handled before the runtime starts"),
    }
    Ok(())
}

fn print_series(points: &[SeriesPoint]) {
    for point in points {
        println!("{},{}", point.timestamp.to_rfc3339(), point.value);
    }
}

fn unit_suffix(metric: Metric) -> String {
    match metric.unit() {
        "" => String::new(),
        unit => format!(", {}", unit),
    }
}

fn opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}", v))
}
