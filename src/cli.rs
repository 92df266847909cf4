//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stablepulse - stablecoin adoption tracker
///
/// Pulls supply and money-supply data from public APIs, maintains
/// rolling monthly series on disk, evaluates adoption milestones and
/// aggregates every tracked domain into one composite signal.
///
/// Examples:
///   stablepulse supply
///   stablepulse supply --mock
///   stablepulse money-supply --data-dir ./data
///   stablepulse signal
///   stablepulse all
///   stablepulse init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Pipeline stage to run
    #[command(subcommand)]
    pub command: Command,

    /// Use existing data instead of fetching from APIs
    #[arg(long, global = true)]
    pub mock: bool,

    /// Root directory for persisted data documents
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .stablepulse.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// FRED API key (required for live money-supply fetches)
    #[arg(long, global = true, env = "FRED_API_KEY", hide_env_values = true)]
    pub fred_api_key: Option<String>,

    /// Request timeout in seconds for API fetches
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Pipeline stages.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Fetch stablecoin supply and M1, update the supply series and
    /// its milestones
    Supply,
    /// Fetch M1 money supply observations from FRED
    MoneySupply,
    /// Validate the regulatory tracker and compute days-until-effective
    Regulatory,
    /// Aggregate all domains into the composite signal
    Signal,
    /// Run every stage in order (supply, money-supply, regulatory, signal)
    All,
    /// Generate a default .stablepulse.toml configuration file
    InitConfig,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref data_dir) = self.data_dir {
            if data_dir.exists() && !data_dir.is_dir() {
                return Err(format!(
                    "Data path is not a directory: {}",
                    data_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            command: Command::Signal,
            mock: false,
            data_dir: None,
            config: None,
            fred_api_key: None,
            timeout: None,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());

        args.timeout = Some(30);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_subcommand_parsing() {
        let args = Args::try_parse_from(["stablepulse", "supply", "--mock"]).unwrap();
        assert_eq!(args.command, Command::Supply);
        assert!(args.mock);

        let args = Args::try_parse_from(["stablepulse", "money-supply"]).unwrap();
        assert_eq!(args.command, Command::MoneySupply);
    }
}
