//! Stablepulse - stablecoin adoption tracker
//!
//! A CLI tool that pulls supply data from DefiLlama and M1 from FRED,
//! maintains rolling monthly series on disk, evaluates adoption
//! milestones and aggregates every tracked domain into one composite
//! signal.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (fetch, config, missing data, etc.)

mod cli;
mod commands;
mod composite;
mod config;
mod fetch;
mod metrics;
mod milestones;
mod models;
mod series;
mod store;

use anyhow::{Context, Result};
use cli::{Args, Command};
use config::Config;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if args.command == Command::InitConfig {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Stablepulse v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Run failed: {}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .stablepulse.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".stablepulse.toml");

    if path.exists() {
        eprintln!("⚠️  .stablepulse.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .stablepulse.toml")?;

    println!("✅ Created .stablepulse.toml with default settings.");
    println!("   Edit it to customize the data directory and fetch timeouts.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch the selected pipeline stage.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let mode = if args.mock { "mock" } else { "live" };
    info!("Data directory: {} ({} mode)", config.general.data_dir, mode);

    match args.command {
        Command::Supply => commands::run_supply(&config, args.mock).await,
        Command::MoneySupply => commands::run_money_supply(&config, args.mock).await,
        Command::Regulatory => commands::run_regulatory(&config, args.mock).await,
        Command::Signal => commands::run_signal(&config, args.mock).await,
        Command::All => commands::run_all(&config, args.mock).await,
        Command::InitConfig => unreachable!("handled before dispatch"),
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .stablepulse.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
