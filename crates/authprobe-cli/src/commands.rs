//! CLI command definitions using clap

use authprobe::SuiteKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// authprobe: run page-object UI suites against a login application
#[derive(Parser, Debug)]
#[command(name = "authprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Harness configuration file (YAML)
    #[arg(long, global = true, env = "AUTHPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the application base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Override the log level (DEBUG, INFO, WARN, ERROR)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a test suite
    Run(RunArgs),

    /// List data-driven test cases
    List(ListArgs),

    /// Print the resolved configuration as YAML
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Test data file (JSON array of cases); defaults to the built-in table
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Suite to run
    #[arg(long, value_enum, default_value = "login")]
    pub suite: SuiteArg,

    /// Run only these case ids (repeatable)
    #[arg(long = "only", value_name = "ID")]
    pub only: Vec<String>,

    /// Record these case ids as skipped (repeatable)
    #[arg(long = "skip", value_name = "ID")]
    pub skip: Vec<String>,

    /// Tests in flight at once
    #[arg(short = 'j', long, default_value = "1")]
    pub jobs: usize,

    /// Run against the built-in simulated application
    #[arg(long)]
    pub simulate: bool,

    /// Retries for a failed test (defaults to the configured max_retries)
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-test time budget in seconds
    #[arg(long, default_value = "120")]
    pub test_timeout: u64,

    /// Directory for results.json and junit.xml
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

/// Arguments for the list command
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Test data file (JSON array of cases); defaults to the built-in table
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Only cases expected to log in
    #[arg(long, conflicts_with = "negative")]
    pub positive: bool,

    /// Only cases expected to be rejected
    #[arg(long)]
    pub negative: bool,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Only validate; print nothing on success
    #[arg(long)]
    pub check: bool,
}

/// Suite selection
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuiteArg {
    /// Data-driven login table
    #[default]
    Login,
    /// TC009 logout flow
    Logout,
    /// TC010 session check
    Session,
    /// Everything
    All,
}

impl From<SuiteArg> for SuiteKind {
    fn from(arg: SuiteArg) -> Self {
        match arg {
            SuiteArg::Login => Self::Login,
            SuiteArg::Logout => Self::Logout,
            SuiteArg::Session => Self::Session,
            SuiteArg::All => Self::All,
        }
    }
}

/// Color choice argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_run_defaults() {
            let cli = Cli::try_parse_from(["authprobe", "run", "--simulate"]).unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert!(args.simulate);
            assert_eq!(args.suite, SuiteArg::Login);
            assert_eq!(args.jobs, 1);
            assert!(args.retries.is_none());
        }

        #[test]
        fn test_run_repeatable_filters_and_globals() {
            let cli = Cli::try_parse_from([
                "authprobe", "run", "--only", "TC001", "--only", "TC003", "--skip", "TC002",
                "--suite", "all", "-j", "4", "--base-url", "http://localhost:8080", "-vv",
            ])
            .unwrap();
            assert_eq!(cli.verbose, 2);
            assert_eq!(cli.base_url.as_deref(), Some("http://localhost:8080"));
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.only, vec!["TC001", "TC003"]);
            assert_eq!(args.skip, vec!["TC002"]);
            assert_eq!(SuiteKind::from(args.suite), SuiteKind::All);
            assert_eq!(args.jobs, 4);
        }

        #[test]
        fn test_list_flags_conflict() {
            assert!(
                Cli::try_parse_from(["authprobe", "list", "--positive", "--negative"]).is_err()
            );
            assert!(Cli::try_parse_from(["authprobe", "list", "--negative"]).is_ok());
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["authprobe"]).is_err());
        }
    }
}
