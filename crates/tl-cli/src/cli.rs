//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Forensic timeline normalizer.
///
/// Recognizes known log files and application databases and turns their
/// records into normalized, timestamped events.
#[derive(Debug, Parser)]
#[command(name = "tl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the parsers that can claim a file.
    Parsers,

    /// Report which parsers claim each file.
    Detect {
        /// Evidence files to inspect.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Extract events from files as JSON lines on stdout.
    Scan {
        /// Evidence files to scan.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Skip detection and scan every file with this parser.
        #[arg(short, long)]
        parser: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scan_accepts_forced_parser() {
        let cli = Cli::parse_from(["tl", "scan", "--parser", "zsh_extended_history", "a", "b"]);
        match cli.command {
            Some(Commands::Scan { paths, parser }) => {
                assert_eq!(paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
                assert_eq!(parser.as_deref(), Some("zsh_extended_history"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn detect_requires_a_path() {
        assert!(Cli::try_parse_from(["tl", "detect"]).is_err());
    }
}
