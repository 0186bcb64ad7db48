//! tickgate CLI: run the decision loop, evaluate once, validate a config.
//!
//! Commands:
//! - `run`: start the decision loop on the configured interval
//! - `evaluate`: fetch market data and print the entry evaluation (no orders)
//! - `check-config`: validate a TOML config and print its fingerprint

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tickgate_core::config::{Credentials, EngineConfig};
use tickgate_core::engine::{Engine, Notifier, Ports};
use tickgate_core::exchange::BinanceClient;
use tickgate_core::notify::build_notifier;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Shortest pause between ticks, however long a tick took.
const MIN_SLEEP: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(
    name = "tickgate",
    about = "tickgate: single-instrument futures decision loop"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override `[logging] level` (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Read credentials from this file instead of `./.env`.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the decision loop against the exchange.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Run a single tick and exit.
        #[arg(long, default_value_t = false)]
        once: bool,
    },
    /// Evaluate the entry conditions once and print the justification trail.
    Evaluate {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Validate a config file and print its fingerprint.
    CheckConfig {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    load_env_file(cli.env_file.as_deref())?;

    match cli.command {
        Commands::Run { config, once } => run_loop(&config, cli.log_level.as_deref(), once),
        Commands::Evaluate { config } => run_evaluate(&config, cli.log_level.as_deref()),
        Commands::CheckConfig { config } => run_check_config(&config),
    }
}

/// Populate the process environment from a dotenv file. Variables already
/// set take precedence. A missing `./.env` is fine; a missing explicit file
/// is not.
fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => dotenv::from_path(path)
            .with_context(|| format!("loading env file {}", path.display())),
        None => {
            dotenv::dotenv().ok();
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    EngineConfig::from_file(path).with_context(|| format!("loading config {}", path.display()))
}

fn init_logging(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .with_context(|| format!("invalid log level {level:?}"))?;
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;
    Ok(())
}

fn log_startup(config: &EngineConfig) -> Result<()> {
    info!(
        fingerprint = %config.fingerprint()?,
        symbol = %config.instrument.symbol,
        variant = config.strategy.variant.as_str(),
        environment = ?config.exchange.environment,
        "configuration loaded"
    );
    Ok(())
}

fn run_loop(path: &Path, log_level: Option<&str>, once: bool) -> Result<()> {
    let config = load_config(path)?;
    init_logging(log_level.unwrap_or(&config.logging.level))?;
    log_startup(&config)?;

    let credentials = Credentials::from_env().context("exchange credentials")?;
    let client = BinanceClient::new(&config, Some(credentials))?;
    client.prepare_account(&config.instrument);

    let notifier = build_notifier(&config);
    let engine = Engine::from_config(&config);
    let ports = Ports {
        market: &client,
        account: &client,
        executor: &client,
        notifier: notifier.as_ref(),
    };

    let mut state = engine.start(&ports).context("reading starting equity")?;
    let interval = Duration::from_secs(config.schedule.interval_secs);

    loop {
        let started = Instant::now();
        match engine.tick(&state, &ports) {
            Ok((next, outcome)) => {
                state = next;
                info!(%outcome, "tick complete");
            }
            Err(err) => {
                error!(error = %err, "tick failed");
                if let Err(notify_err) = notifier.notify(&format!("tick failed: {err}")) {
                    warn!(error = %notify_err, "notification failed");
                }
            }
        }

        if once {
            return Ok(());
        }

        let pause = interval.saturating_sub(started.elapsed()).max(MIN_SLEEP);
        debug!(secs = pause.as_secs(), "sleeping until next tick");
        std::thread::sleep(pause);
    }
}

fn run_evaluate(path: &Path, log_level: Option<&str>) -> Result<()> {
    let config = load_config(path)?;
    init_logging(log_level.unwrap_or(&config.logging.level))?;
    log_startup(&config)?;

    let client = BinanceClient::new(&config, None)?;
    let engine = Engine::from_config(&config);
    let evaluation = engine.evaluate_once(&client)?;

    println!("{} {} ({})", config.instrument.symbol, config.timeframes.entry, engine.evaluator_name());
    println!("{}", evaluation.explain());
    Ok(())
}

fn run_check_config(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    println!("config OK: {}", path.display());
    println!("fingerprint: {}", config.fingerprint()?);
    println!();
    print!("{}", config.to_toml_string()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn env_file_fills_unset_variables_only() {
        std::env::set_var("TICKGATE_ENV_FILE_PRESET", "from-shell");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "TICKGATE_ENV_FILE_KEY=abc123").unwrap();
        writeln!(file, "TICKGATE_ENV_FILE_PRESET=from-file").unwrap();

        load_env_file(Some(file.path())).unwrap();
        assert_eq!(std::env::var("TICKGATE_ENV_FILE_KEY").unwrap(), "abc123");
        assert_eq!(std::env::var("TICKGATE_ENV_FILE_PRESET").unwrap(), "from-shell");
    }

    #[test]
    fn missing_explicit_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_env_file(Some(&dir.path().join("absent.env"))).unwrap_err();
        assert!(err.to_string().contains("absent.env"), "{err}");
    }

    #[test]
    fn env_file_flag_is_global() {
        let cli = Cli::try_parse_from([
            "tickgate",
            "check-config",
            "--config",
            "tickgate.toml",
            "--env-file",
            "secrets.env",
        ])
        .unwrap();
        assert_eq!(cli.env_file, Some(PathBuf::from("secrets.env")));
    }
}
