//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

use crate::logic::config::OperatingMode;

/// ProcSentry - process risk scoring and policy enforcement agent
#[derive(Parser, Debug)]
#[command(name = "procsentry")]
#[command(author, version)]
#[command(about = "Continuously evaluates running processes for malicious behavior and \
enforces policy on high-risk ones")]
pub struct Cli {
    /// Operating mode; overrides the config file when given
    #[arg(long, value_enum)]
    pub mode: Option<OperatingMode>,

    /// Snapshot polling interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    /// Audit database path [default: platform data directory]
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logging verbosity (error, warn, info, debug, trace).
    /// RUST_LOG overrides this when set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["procsentry"]);
        assert!(cli.mode.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_mode_parses() {
        let cli = Cli::parse_from(["procsentry", "--mode", "lockdown", "--interval", "2"]);
        assert_eq!(cli.mode, Some(OperatingMode::Lockdown));
        assert_eq!(cli.interval, Some(2));
    }
}
