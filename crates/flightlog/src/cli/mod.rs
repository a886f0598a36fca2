//! Command-line interface for flightlog.
//!
//! This module provides the CLI structure for the `flightlog` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AchievementsCommand, AddCommand, CabinArg, CardCommand, ConfigCommand, ExportCommand,
    ImportCommand, ListCommand, OutputFormat, PriceCommand, StatsCommand, StatusCommand,
};

/// flightlog - Personal flight log with achievements and fare alerts
///
/// Records the flights you take, unlocks milestones as your history grows,
/// renders itinerary cards and watches fares for routes you care about.
#[derive(Debug, Parser)]
#[command(name = "flightlog")]
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
    /// Log a flight
    Add(AddCommand),

    /// List logged flights
    List(ListCommand),

    /// Show flight statistics
    Stats(StatsCommand),

    /// Show unlocked achievements
    Achievements(AchievementsCommand),

    /// Render itinerary cards
    Card(CardCommand),

    /// Import flights from a JSON file
    Import(ImportCommand),

    /// Export all records and achievements as JSON
    Export(ExportCommand),

    /// Check and list fares
    #[command(subcommand)]
    Price(PriceCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn status_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "flightlog");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(status_cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(3, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(status_cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(status_cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let args = vec![
            "flightlog",
            "add",
            "--flight",
            "CA981",
            "--from",
            "PEK",
            "--to",
            "JFK",
            "--departure",
            "2024-01-15T13:00",
            "--arrival",
            "2024-01-15T14:30",
            "--airline",
            "Air China",
            "--cabin",
            "business",
            "--distance",
            "11000",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Add(add) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(add.cabin, CabinArg::Business);
        assert_eq!(add.distance, 11_000);
        assert!(!add.card);
    }

    #[test]
    fn test_parse_add_requires_fields() {
        let args = vec!["flightlog", "add", "--flight", "CA981"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_list_defaults() {
        let cli = Cli::try_parse_from(vec!["flightlog", "list"]).unwrap();
        let Command::List(list) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(list.format, OutputFormat::Table);
        assert!(list.limit.is_none());
    }

    #[test]
    fn test_parse_stats_month_range() {
        let ok = Cli::try_parse_from(vec!["flightlog", "stats", "--year", "2024", "--month", "3"]);
        assert!(ok.is_ok());
        let bad = Cli::try_parse_from(vec!["flightlog", "stats", "--month", "13"]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_parse_card_flight_conflicts_with_latest() {
        let ok = Cli::try_parse_from(vec!["flightlog", "card", "--flight", "CA981"]);
        assert!(ok.is_ok());
        let bad = Cli::try_parse_from(vec![
            "flightlog", "card", "--flight", "CA981", "--latest", "2",
        ]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_parse_price_check() {
        let args = vec![
            "flightlog",
            "price",
            "check",
            "--from",
            "PEK",
            "--to",
            "NRT",
            "--date",
            "2024-03-01",
            "--threshold",
            "50",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Price(PriceCommand::Check { threshold, .. }) = cli.command else {
            panic!("expected price check");
        };
        assert_eq!(threshold, Some(50.0));
    }

    #[test]
    fn test_parse_price_check_rejects_bad_date() {
        let args = vec![
            "flightlog", "price", "check", "--from", "PEK", "--to", "NRT", "--date", "03/01/24",
        ];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["flightlog", "-c", "/custom/config.toml", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(vec!["flightlog", "stats", "-v", "-q"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_config_validate() {
        let args = vec!["flightlog", "config", "validate", "--file", "x.toml"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }
}
