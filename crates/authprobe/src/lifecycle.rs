//! Test lifecycle hooks
//!
//! ```text
//! before_all ──► ( before_each ──► scenario ──► after_each )* ──► after_all
//!   banner         banner,            │          log outcome,      summary,
//!   timestamp      page observers     │          screenshot on     export
//!                                     │          failure, record
//! ```
//!
//! `after_each` and `skip` are the only places a test is counted, so each
//! test reaches the [`TestListener`] exactly once.

use crate::config::HarnessConfig;
use crate::driver::{ConsoleKind, Driver, PageEvent};
use crate::listener::TestListener;
use crate::logger::Logger;
use crate::reporter::{Reporter, RunReport, TestOutcome, TestStatus};
use crate::result::ProbeResult;
use crate::screenshot::ScreenshotCapturer;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const RULE: &str = "========================================";

/// Identity of a running test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestInfo {
    /// Case id, for data-driven tests
    pub id: Option<String>,
    /// Title used in logs, artifacts and reports
    pub title: String,
}

impl TestInfo {
    /// Create test info
    #[must_use]
    pub fn new(id: Option<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// Hooks bracketing a suite and each of its tests
#[derive(Debug)]
pub struct TestLifecycle {
    logger: Arc<Logger>,
    capturer: Arc<ScreenshotCapturer>,
    listener: Arc<TestListener>,
    reporter: Option<Reporter>,
    screenshot_on_failure: bool,
}

impl TestLifecycle {
    /// Lifecycle exporting into `config.report_paths.report_dir`
    #[must_use]
    pub fn new(
        logger: Arc<Logger>,
        capturer: Arc<ScreenshotCapturer>,
        config: &HarnessConfig,
    ) -> Self {
        let reporter = Reporter::new(&config.report_paths.report_dir, Arc::clone(&logger));
        Self {
            logger,
            capturer,
            listener: Arc::new(TestListener::new()),
            reporter: Some(reporter),
            screenshot_on_failure: config.screenshot_on_failure,
        }
    }

    /// Skip result export in `after_all`
    #[must_use]
    pub fn without_export(mut self) -> Self {
        self.reporter = None;
        self
    }

    /// Shared logger
    #[must_use]
    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// Shared screenshot capturer
    #[must_use]
    pub fn capturer(&self) -> &Arc<ScreenshotCapturer> {
        &self.capturer
    }

    /// Counters for this lifecycle
    #[must_use]
    pub fn listener(&self) -> &Arc<TestListener> {
        &self.listener
    }

    /// Suite banner. Returns the start timestamp.
    pub fn before_all(&self, suite: &str) -> DateTime<Utc> {
        let started = Utc::now();
        self.logger.info(RULE);
        self.logger.info(format!("Starting Test Suite Execution: {suite}"));
        self.logger.info(RULE);
        self.logger.info(format!("Timestamp: {}", started.to_rfc3339()));
        started
    }

    /// Test banner, plus page observers when a session is open
    pub fn before_each(&self, test: &TestInfo, driver: Option<&dyn Driver>) {
        self.logger.info(format!(">>> Starting Test: {}", test.title));
        if let Some(driver) = driver {
            let logger = Arc::clone(&self.logger);
            driver.subscribe(Arc::new(move |event: &PageEvent| match event {
                PageEvent::PageError(message) => {
                    logger.error(format!("Page JavaScript error: {message}"));
                }
                PageEvent::Console(msg) if msg.kind == ConsoleKind::Error => {
                    logger.warn(format!("Console error: {}", msg.text));
                }
                PageEvent::Navigated(url) => logger.debug(format!("Navigated to: {url}")),
                PageEvent::Console(_) => {}
            }));
        }
    }

    /// Log the outcome, capture a screenshot on failure and count the test
    pub async fn after_each(
        &self,
        test: &TestInfo,
        driver: Option<&dyn Driver>,
        result: &ProbeResult<()>,
        duration: Duration,
        attempts: u32,
    ) -> TestOutcome {
        let mut outcome = match result {
            Ok(()) => {
                self.logger.info(format!("Test PASSED: {}", test.title));
                TestOutcome::passed(&test.title, duration)
            }
            Err(e) => {
                self.logger.error(format!("Test FAILED: {}", test.title));
                self.logger
                    .error_with(format!("Failure: {e}"), json!({ "attempts": attempts }));
                TestOutcome::failed(&test.title, duration, e.to_string())
            }
        }
        .with_id(test.id.clone())
        .with_attempts(attempts);

        if result.is_err() && self.screenshot_on_failure {
            match driver {
                Some(driver) => match self.capturer.capture_screenshot(driver, &test.title).await {
                    Ok(artifact) => {
                        self.logger
                            .info(format!("Screenshot saved for failed test: {}", test.title));
                        outcome.artifacts.push(artifact.file_path);
                    }
                    Err(e) => self
                        .logger
                        .error(format!("Failed to capture screenshot: {e}")),
                },
                None => self
                    .logger
                    .warn(format!("No session to capture for: {}", test.title)),
            }
        }

        self.finish(outcome)
    }

    /// Count a test that never ran
    pub fn skip(&self, test: &TestInfo, reason: &str) -> TestOutcome {
        self.logger
            .info(format!("Test SKIPPED: {} ({reason})", test.title));
        self.finish(TestOutcome::skipped(&test.title).with_id(test.id.clone()))
    }

    fn finish(&self, outcome: TestOutcome) -> TestOutcome {
        self.listener.record_test_result(outcome.status);
        self.logger
            .info(format!("Test duration: {}ms", outcome.duration.as_millis()));
        self.logger
            .info(format!("<<< Completed Test: {}", outcome.name));
        outcome
    }

    /// Log the summary and export results. Export failures are logged only.
    pub async fn after_all(
        &self,
        suite: &str,
        started_at: DateTime<Utc>,
        outcomes: Vec<TestOutcome>,
    ) -> (RunReport, Vec<PathBuf>) {
        let stats = self.listener.report();
        self.logger.info(RULE);
        self.logger.info(format!("Test Suite Execution Completed: {suite}"));
        for line in stats.summary_lines() {
            self.logger.info(line);
        }

        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.status == TestStatus::Failed)
            .map(|o| o.name.as_str())
            .collect();
        if !failed.is_empty() {
            self.logger
                .error_with("Failed tests", json!({ "tests": failed }));
        }

        let report = RunReport::new(suite, started_at, stats, outcomes);
        let written = match &self.reporter {
            Some(reporter) => reporter.export(&report).await,
            None => Vec::new(),
        };
        (report, written)
    }
}
