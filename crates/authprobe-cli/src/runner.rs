//! Command execution
//!
//! Wires the harness configuration, logger, session factory and executor
//! together for `run`, and renders the `list` table.

use crate::commands::{ListArgs, RunArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use authprobe::mock::{LoginAppConfig, MockSessionFactory};
use authprobe::{
    canonical_login_cases, DataDrivenExecutor, ExecutorOptions, HarnessConfig, Logger,
    LoggerConfig, Scenario, ScreenshotCapturer, SessionFactory, SuiteKind, SuiteReport, TestCase,
    TestDataProvider, TestLifecycle, TestStatus,
};
use console::style;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Executes suites from parsed arguments
#[derive(Debug)]
pub struct TestRunner {
    cli: CliConfig,
    harness: Arc<HarnessConfig>,
    logger: Arc<Logger>,
}

impl TestRunner {
    /// Create a runner; opens the run log under `logs_dir`
    #[must_use]
    pub fn new(cli: CliConfig, harness: HarnessConfig) -> Self {
        let logger = Arc::new(Logger::new(
            LoggerConfig::new()
                .with_level(harness.log_level)
                .with_logs_dir(&harness.logs_dir)
                .with_console(!cli.verbosity.is_quiet()),
        ));
        Self {
            cli,
            harness: Arc::new(harness),
            logger,
        }
    }

    /// Harness configuration in effect
    #[must_use]
    pub fn harness(&self) -> &HarnessConfig {
        &self.harness
    }

    /// Run a suite; `Ok(false)` when any test failed
    pub fn run(&self, args: &RunArgs) -> CliResult<bool> {
        let mut harness = (*self.harness).clone();
        if let Some(dir) = &args.report_dir {
            harness.report_paths.report_dir.clone_from(dir);
        }
        let harness = Arc::new(harness);

        let provider = TestDataProvider::new(Arc::clone(&self.logger));
        let cases = load_cases(&provider, args.data.as_deref())?;
        provider.validate_unique_ids(&cases)?;

        let suite = SuiteKind::from(args.suite);
        let scenarios = select(suite.scenarios(&cases), &args.only)?;
        tracing::info!(suite = %suite, tests = scenarios.len(), "starting run");

        let sessions = session_factory(args, &harness)?;
        let capturer = Arc::new(ScreenshotCapturer::new(
            &harness.screenshots_dir,
            Arc::clone(&self.logger),
        ));
        let lifecycle = Arc::new(TestLifecycle::new(
            Arc::clone(&self.logger),
            capturer,
            &harness,
        ));
        let options = ExecutorOptions::from_config(&harness)
            .with_concurrency(args.jobs)
            .with_test_timeout(Duration::from_secs(args.test_timeout))
            .with_skip(args.skip.iter().cloned());
        let options = match args.retries {
            Some(retries) => options.with_max_retries(retries),
            None => options,
        };
        let executor = DataDrivenExecutor::new(sessions, lifecycle, Arc::clone(&harness), options);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let report = runtime.block_on(executor.run_suite(suite.as_str(), &scenarios));

        if let Err(e) = self.logger.flush() {
            tracing::warn!(error = %e, "log flush failed");
        }
        self.print_summary(&report);
        Ok(report.success())
    }

    /// Print the case table
    pub fn list(&self, args: &ListArgs) -> CliResult<()> {
        let provider = TestDataProvider::new(Arc::clone(&self.logger));
        let cases = load_cases(&provider, args.data.as_deref())?;
        let cases = if args.positive {
            provider.positive_cases(&cases)
        } else if args.negative {
            provider.negative_cases(&cases)
        } else {
            cases
        };

        if args.json {
            println!("{}", serde_json::to_string_pretty(&cases)?);
            return Ok(());
        }
        for case in &cases {
            let mark = if case.should_succeed {
                style("pass").green()
            } else {
                style("reject").yellow()
            };
            println!(
                "{:<6} {:<8} {} ({})",
                case.id,
                mark,
                case.name,
                case.expected_result
            );
        }
        Ok(())
    }

    fn print_summary(&self, report: &SuiteReport) {
        if self.cli.verbosity.is_quiet() {
            return;
        }
        println!();
        for outcome in report.outcomes() {
            let mark = match outcome.status {
                TestStatus::Passed => style("PASS").green().bold(),
                TestStatus::Failed => style("FAIL").red().bold(),
                TestStatus::Skipped => style("SKIP").yellow(),
            };
            println!(
                "{mark} {} ({}ms)",
                outcome.name,
                outcome.duration.as_millis()
            );
            if let Some(error) = &outcome.error {
                println!("     {}", style(error).dim());
            }
            for artifact in &outcome.artifacts {
                println!("     screenshot: {}", artifact.display());
            }
        }
        let stats = report.run.stats;
        let line = format!(
            "{} passed, {} failed, {} skipped ({:.2}%)",
            stats.passed,
            stats.failed,
            stats.skipped,
            stats.success_rate()
        );
        if report.success() {
            println!("\n{}", style(line).green());
        } else {
            println!("\n{}", style(line).red());
        }
        for path in &report.exported {
            println!("report: {}", path.display());
        }
    }
}

fn load_cases(provider: &TestDataProvider, data: Option<&Path>) -> CliResult<Vec<TestCase>> {
    match data {
        Some(path) => Ok(provider.load_from_json(path)?),
        None => Ok(provider.load_static(canonical_login_cases())),
    }
}

/// Keep only scenarios named in `only`; an empty filter keeps everything
fn select(
    mut scenarios: Vec<Box<dyn Scenario>>,
    only: &[String],
) -> CliResult<Vec<Box<dyn Scenario>>> {
    if only.is_empty() {
        return Ok(scenarios);
    }
    let unknown: Vec<&str> = only
        .iter()
        .filter(|id| !scenarios.iter().any(|s| s.id() == Some(id.as_str())))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "--only {}: no such test in this suite",
            unknown.join(", ")
        )));
    }
    scenarios.retain(|s| s.id().is_some_and(|id| only.iter().any(|o| o == id)));
    Ok(scenarios)
}

#[cfg(feature = "browser")]
fn session_factory(args: &RunArgs, harness: &HarnessConfig) -> CliResult<Arc<dyn SessionFactory>> {
    if args.simulate {
        return Ok(simulated(harness));
    }
    let config = authprobe::BrowserConfig::default().with_headless(!args.headed);
    Ok(Arc::new(authprobe::ChromiumSessionFactory::new(config)))
}

#[cfg(not(feature = "browser"))]
fn session_factory(args: &RunArgs, harness: &HarnessConfig) -> CliResult<Arc<dyn SessionFactory>> {
    if args.simulate {
        return Ok(simulated(harness));
    }
    if args.headed {
        tracing::warn!("--headed has no effect without a browser");
    }
    Err(CliError::test_execution(
        "built without the `browser` feature; pass --simulate to run against the built-in application",
    ))
}

fn simulated(harness: &HarnessConfig) -> Arc<dyn SessionFactory> {
    tracing::info!(base_url = %harness.base_url, "using simulated application");
    Arc::new(MockSessionFactory::login_app(LoginAppConfig::from_harness(
        harness,
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod select_tests {
        use super::*;

        fn login_suite() -> Vec<Box<dyn Scenario>> {
            SuiteKind::All.scenarios(&canonical_login_cases())
        }

        #[test]
        fn test_empty_filter_keeps_all() {
            assert_eq!(select(login_suite(), &[]).unwrap().len(), 10);
        }

        #[test]
        fn test_filter_keeps_order() {
            let only = vec!["TC010".to_string(), "TC002".to_string()];
            let ids: Vec<_> = select(login_suite(), &only)
                .unwrap()
                .iter()
                .map(|s| s.id().unwrap().to_string())
                .collect();
            assert_eq!(ids, vec!["TC002", "TC010"]);
        }

        #[test]
        fn test_unknown_id_rejected() {
            let only = vec!["TC999".to_string()];
            assert!(matches!(
                select(login_suite(), &only),
                Err(CliError::InvalidArgument { .. })
            ));
        }
    }
}
