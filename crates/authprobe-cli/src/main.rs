//! authprobe: page-object UI suites for a login application
//!
//! ## Usage
//!
//! ```bash
//! authprobe run --simulate                  # Data-driven login table
//! authprobe run --suite all --simulate -j 4 # Login, logout and session
//! authprobe run --only TC001 --only TC003   # Selected rows
//! authprobe list --negative                 # Rows expected to be rejected
//! authprobe config                          # Resolved configuration
//! ```

use authprobe_cli::{
    resolve_harness_config, Cli, CliConfig, CliResult, Commands, ConfigArgs, TestRunner,
};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run() -> CliResult<bool> {
    let cli = Cli::parse();
    let config = CliConfig::from_cli(&cli);
    config.apply_colors();
    init_tracing(&config);

    let harness = resolve_harness_config(&cli)?;
    match cli.command {
        Commands::Config(args) => {
            print_config(&harness, &args)?;
            Ok(true)
        }
        Commands::List(args) => {
            TestRunner::new(config, harness).list(&args)?;
            Ok(true)
        }
        Commands::Run(args) => TestRunner::new(config, harness).run(&args),
    }
}

fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.tracing_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_config(harness: &authprobe::HarnessConfig, args: &ConfigArgs) -> CliResult<()> {
    if !args.check {
        print!("{}", harness.to_yaml()?);
    }
    Ok(())
}
