//! CLI argument parsing with clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Caseport - test case metadata from Python test trees
#[derive(Parser)]
#[command(name = "caseport")]
#[command(version = VERSION)]
#[command(about = "Collect test case metadata from Python test trees")]
#[command(long_about = "Caseport walks a Python test tree and builds one record per test.\n\nFields are read from `:name: value` field lists in package, module, class and test docstrings, with inner scopes overriding outer ones. Markers are derived from pytest decorators and `pytestmark`. Configured defaults and transforms are applied last.")]
pub struct Cli {
    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every command that collects tests
#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    /// Test file or directory to collect
    pub path: PathBuf,

    /// Skip a file or directory (repeatable)
    #[arg(long = "ignore", value_name = "PATH")]
    pub ignore_paths: Vec<PathBuf>,

    /// TOML configuration layered over the built-in fields
    #[arg(long, value_name = "FILE", env = "CASEPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory that module paths are relative to
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect tests and show their resolved fields
    ///
    /// Prints every test module with the tests it defines.
    #[command(long_about = "Collect tests and show their resolved fields.\n\nTest modules match test_*.py or *_test.py. Tests are functions and methods named test_*. Files that fail to parse are reported and skipped; the rest of the tree is still collected.")]
    Collect {
        #[command(flatten)]
        args: CollectArgs,

        /// Show every field of every test
        #[arg(long)]
        fields: bool,
    },

    /// Check collected tests for missing required fields
    ///
    /// Exits with status 1 when any error is found.
    #[command(long_about = "Check collected tests for missing required fields.\n\nChecks:\n  E001  Test modules that fail to parse\n  E005  Required fields (default: id) that are absent or empty\n  W001  Steps without expected results, or the reverse\n  W002  Step and expected result lists of different lengths")]
    Validate {
        #[command(flatten)]
        args: CollectArgs,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// List the requirements that collected tests verify
    Requirements {
        #[command(flatten)]
        args: CollectArgs,
    },

    /// Show version information
    Version,
}

/// Get the command args for use in the application
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_collect_args() {
        let cli = Cli::try_parse_from([
            "caseport",
            "--json",
            "collect",
            "tests",
            "--ignore",
            "tests/slow",
            "--ignore",
            "tests/old",
            "--base-dir",
            ".",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Some(Commands::Collect { args, fields }) => {
                assert_eq!(args.path, PathBuf::from("tests"));
                assert_eq!(args.ignore_paths.len(), 2);
                assert_eq!(args.base_dir, Some(PathBuf::from(".")));
                assert!(!fields);
            }
            _ => panic!("expected collect"),
        }
    }
}
