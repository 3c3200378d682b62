//! Tally - analytics event buffer tool
//!
//! # Usage
//!
//! ```bash
//! # Show what is waiting in the event cache
//! tally inspect
//! tally inspect --json
//!
//! # Record an event into the cache
//! tally record --name levelCompleted --param level=3 --param zone=forest
//!
//! # Upload cached events
//! tally flush --config tally.toml
//!
//! # Drop cached events
//! tally clear
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tally_config::Config;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Tally - analytics event buffer tool
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show cached events
    Inspect(cmd::inspect::InspectArgs),

    /// Delete the event cache
    Clear,

    /// Record an event into the cache
    Record(cmd::record::RecordArgs),

    /// Upload cached events to the collect endpoint
    Flush(cmd::flush::FlushArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = resolve_log_level(cli.log_level.as_deref(), cli.config.as_deref());
    init_logging(&log_level)?;

    let config = cmd::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Inspect(args) => cmd::inspect::run(&config, args),
        Command::Clear => cmd::clear::run(&config),
        Command::Record(args) => cmd::record::run(&config, args),
        Command::Flush(args) => cmd::flush::run(&config, args).await,
    }
}

/// Resolve log level: CLI flag > config file > "info"
fn resolve_log_level(cli_level: Option<&str>, config_path: Option<&std::path::Path>) -> String {
    if let Some(level) = cli_level {
        return level.to_string();
    }

    if let Some(path) = config_path
        && path.exists()
        && let Ok(config) = Config::from_file(path)
    {
        return config.log.level.as_str().to_string();
    }

    "info".to_string()
}

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr; stdout carries command output.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_level_wins() {
        assert_eq!(resolve_log_level(Some("trace"), None), "trace");
    }

    #[test]
    fn test_config_level_used() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tally.toml");
        std::fs::write(&path, "[log]\nlevel = \"warn\"").unwrap();
        assert_eq!(resolve_log_level(None, Some(&path)), "warn");
    }

    #[test]
    fn test_default_level() {
        assert_eq!(resolve_log_level(None, None), "info");
        assert_eq!(
            resolve_log_level(None, Some(std::path::Path::new("/nonexistent.toml"))),
            "info"
        );
    }

    #[test]
    fn test_parse_record() {
        let cli = Cli::try_parse_from([
            "tally", "record", "--name", "e", "--param", "a=1", "--param", "b=x", "-l", "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Command::Record(args) = cli.command else {
            panic!("expected record");
        };
        assert_eq!(args.name, "e");
        assert_eq!(args.params.len(), 2);
    }
}
