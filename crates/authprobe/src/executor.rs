//! Data-Driven Executor
//!
//! Runs a list of scenarios, each on its own session, and reports outcomes in
//! input order.
//!
//! ```text
//!   scenarios ──► stream::iter ──► buffered(concurrency) ──► outcomes
//!                     │
//!                     ▼ per scenario
//!   skip? ──yes──► Skipped (no session)
//!     │no
//!     ▼
//!   open session ─► before_each ─► run (≤ test_timeout) ─► failed and retries left?
//!     ▲                                                      │yes        │no
//!     └──────────────────── close session ◄──────────────────┘           ▼
//!                                                             after_each ─► close
//! ```

use crate::config::HarnessConfig;
use crate::driver::{Driver, SessionFactory};
use crate::lifecycle::{TestInfo, TestLifecycle};
use crate::page_object::BasePage;
use crate::reporter::{RunReport, TestOutcome};
use crate::result::{ProbeError, ProbeResult};
use crate::scenarios::{Scenario, ScenarioContext};
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default liveness budget for one test attempt
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Budget for closing a session
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Executor options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Tests in flight at once
    pub concurrency: usize,
    /// Liveness budget per attempt
    pub test_timeout: Duration,
    /// Extra attempts for a failed test
    pub max_retries: u32,
    /// Case ids recorded as skipped
    pub skip_ids: HashSet<String>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            test_timeout: DEFAULT_TEST_TIMEOUT,
            max_retries: 0,
            skip_ids: HashSet::new(),
        }
    }
}

impl ExecutorOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options taking `max_retries` from the harness config
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            ..Self::default()
        }
    }

    /// Tests in flight at once (at least 1)
    #[must_use]
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Time budget of a single attempt
    #[must_use]
    pub const fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    /// Extra attempts after a failure
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Record these case ids as skipped
    #[must_use]
    pub fn with_skip<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_ids.extend(ids.into_iter().map(Into::into));
        self
    }
}

/// Result of a suite run
#[derive(Debug, Clone)]
pub struct SuiteReport {
    /// The exported run
    pub run: RunReport,
    /// Files written by the reporter
    pub exported: Vec<PathBuf>,
}

impl SuiteReport {
    /// True iff every test passed or was skipped
    #[must_use]
    pub fn success(&self) -> bool {
        self.run.all_passed()
    }

    /// Outcomes in input order
    #[must_use]
    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.run.outcomes
    }
}

/// Runs scenarios on fresh sessions
pub struct DataDrivenExecutor {
    sessions: Arc<dyn SessionFactory>,
    lifecycle: Arc<TestLifecycle>,
    config: Arc<HarnessConfig>,
    options: ExecutorOptions,
}

impl std::fmt::Debug for DataDrivenExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataDrivenExecutor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DataDrivenExecutor {
    /// Create an executor
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        lifecycle: Arc<TestLifecycle>,
        config: Arc<HarnessConfig>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            sessions,
            lifecycle,
            config,
            options,
        }
    }

    /// Options in effect
    #[must_use]
    pub const fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Hooks shared by every test
    #[must_use]
    pub fn lifecycle(&self) -> &Arc<TestLifecycle> {
        &self.lifecycle
    }

    /// Run a whole suite: `before_all`, every scenario, `after_all`.
    pub async fn run_suite(&self, suite: &str, scenarios: &[Box<dyn Scenario>]) -> SuiteReport {
        let started = self.lifecycle.before_all(suite);
        self.lifecycle.logger().info_with(
            format!("Running {} tests", scenarios.len()),
            json!({
                "concurrency": self.options.concurrency,
                "max_retries": self.options.max_retries,
                "test_timeout_ms": self.options.test_timeout.as_millis() as u64,
            }),
        );
        let outcomes = self.run_all(scenarios).await;
        let (run, exported) = self.lifecycle.after_all(suite, started, outcomes).await;
        SuiteReport { run, exported }
    }

    /// Run scenarios; one outcome per scenario, in input order
    pub async fn run_all(&self, scenarios: &[Box<dyn Scenario>]) -> Vec<TestOutcome> {
        stream::iter(scenarios.iter().map(|s| self.run_one(s.as_ref())))
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await
    }

    /// Run one scenario with retries
    pub async fn run_one(&self, scenario: &dyn Scenario) -> TestOutcome {
        let info = TestInfo::new(scenario.id().map(str::to_string), scenario.title());
        if info
            .id
            .as_ref()
            .is_some_and(|id| self.options.skip_ids.contains(id))
        {
            return self.lifecycle.skip(&info, "listed in skip ids");
        }

        let max_attempts = self.options.max_retries + 1;
        let mut attempt = 1;
        loop {
            let start = Instant::now();
            let (driver, result) = self.attempt(&info, scenario).await;

            if result.is_err() && attempt < max_attempts {
                if let Err(e) = &result {
                    self.lifecycle.logger().warn(format!(
                        "Attempt {attempt}/{max_attempts} of {} failed, retrying: {e}",
                        info.title
                    ));
                }
                self.close(driver.as_deref()).await;
                attempt += 1;
                continue;
            }

            let outcome = self
                .lifecycle
                .after_each(&info, driver.as_deref(), &result, start.elapsed(), attempt)
                .await;
            self.close(driver.as_deref()).await;
            return outcome;
        }
    }

    async fn attempt(
        &self,
        info: &TestInfo,
        scenario: &dyn Scenario,
    ) -> (Option<Arc<dyn Driver>>, ProbeResult<()>) {
        let driver = match self.sessions.open().await {
            Ok(driver) => driver,
            Err(e) => {
                self.lifecycle.before_each(info, None);
                self.lifecycle
                    .logger()
                    .error(format!("Cannot open session for {}: {e}", info.title));
                return (None, Err(e));
            }
        };
        self.lifecycle.before_each(info, Some(driver.as_ref()));

        let ctx = ScenarioContext::new(BasePage::new(
            Arc::clone(&driver),
            Arc::clone(self.lifecycle.logger()),
            Arc::clone(self.lifecycle.capturer()),
            Arc::clone(&self.config),
        ));
        let budget = self.options.test_timeout;
        let result = match tokio::time::timeout(budget, scenario.run(&ctx)).await {
            Ok(result) => result,
            Err(_) => {
                let error = ProbeError::Timeout {
                    ms: budget.as_millis() as u64,
                };
                self.lifecycle
                    .logger()
                    .error(format!("{} exceeded its time budget: {error}", info.title));
                Err(error)
            }
        };
        (Some(driver), result)
    }

    async fn close(&self, driver: Option<&dyn Driver>) {
        let Some(driver) = driver else { return };
        match tokio::time::timeout(CLOSE_TIMEOUT, driver.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self
                .lifecycle
                .logger()
                .warn(format!("Session close failed: {e}")),
            Err(_) => self.lifecycle.logger().warn("Session close timed out"),
        }
    }
}
