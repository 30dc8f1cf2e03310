//! Command-line interface for colorlogger.
//!
//! This module provides the CLI structure for the `colorlog` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ClassifyCommand, ConfigCommand, RunCommand, SummaryCommand};

use crate::logging::Verbosity;

/// colorlog - Colour sensor data logger
///
/// Samples a colour sensor, classifies each reading and logs it to a CSV file
/// on a removable volume. Two buttons toggle recording and mounting.
#[derive(Debug, Parser)]
#[command(name = "colorlog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the logger; type `a` (record), `b` (mount) or `q` (quit) and Enter
    Run(RunCommand),

    /// Classify a single reading
    Classify(ClassifyCommand),

    /// Summarise a log file
    Summary(SummaryCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from((self.verbose, self.quiet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "colorlog");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["colorlog", "run"]).verbosity(), Verbosity::Normal);
        assert_eq!(
            parse(&["colorlog", "-v", "run"]).verbosity(),
            Verbosity::Verbose
        );
        assert_eq!(
            parse(&["colorlog", "-vv", "run"]).verbosity(),
            Verbosity::Trace
        );
        assert_eq!(
            parse(&["colorlog", "-q", "-v", "run"]).verbosity(),
            Verbosity::Quiet
        );
    }

    #[test]
    fn test_parse_run() {
        let cli = parse(&["colorlog", "run", "--duration", "30", "--drive", "sd1"]);
        match cli.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.duration, Some(30));
                assert_eq!(cmd.drive.as_deref(), Some("sd1"));
                assert_eq!(cmd.hold, 10);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_classify() {
        let cli = parse(&["colorlog", "classify", "500", "300", "100", "50", "--json"]);
        match cli.command {
            Command::Classify(cmd) => {
                assert_eq!(cmd.red, 300);
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_classify_rejects_out_of_range() {
        let result = Cli::try_parse_from(["colorlog", "classify", "70000", "0", "0", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_summary() {
        let cli = parse(&["colorlog", "summary", "/media/sd/test.txt"]);
        assert!(matches!(cli.command, Command::Summary(_)));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = parse(&["colorlog", "config", "validate", "-f", "/tmp/c.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["colorlog", "-c", "/custom/config.toml", "config", "path"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
