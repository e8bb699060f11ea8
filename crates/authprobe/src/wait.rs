//! Wait Mechanisms
//!
//! Await-with-timeout primitives used by every page object.
//!
//! Two failure policies coexist:
//!
//! - **Fail-fast**: [`WaitHelper::wait_for_element`] and
//!   [`WaitHelper::wait_for_condition`] log an ERROR and return an error when
//!   the budget runs out.
//! - **Fail-soft**: [`WaitHelper::wait_for_navigation`] never returns an
//!   error of its own. A settle timeout is logged at WARN and reported in the
//!   [`NavigationOutcome`] next to the triggering action's result.

use crate::driver::{is_truthy, Driver};
use crate::locator::Locator;
use crate::logger::Logger;
use crate::result::{ProbeError, ProbeResult};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Network idle threshold (500ms without requests)
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

impl WaitResult {
    /// Create a wait result
    #[must_use]
    pub fn new(elapsed: Duration, waited_for: impl Into<String>) -> Self {
        Self {
            elapsed,
            waited_for: waited_for.into(),
        }
    }

    /// Elapsed time in whole milliseconds
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

/// How the network settled after a navigation-triggering action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    /// No requests in flight for the idle window
    Settled,
    /// The settle budget ran out
    TimedOut,
    /// The driver could not observe network activity
    Failed(String),
}

/// Outcome of [`WaitHelper::wait_for_navigation`]
#[derive(Debug)]
pub struct NavigationOutcome<T> {
    /// Result of the triggering action, untouched
    pub action: ProbeResult<T>,
    /// Network settle status
    pub settle: Settle,
    /// Time until both the action and the settle wait finished
    pub elapsed: Duration,
}

impl<T> NavigationOutcome<T> {
    /// Whether the network settled in time
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settle == Settle::Settled
    }

    /// The action's result, discarding settle status
    pub fn into_result(self) -> ProbeResult<T> {
        self.action
    }
}

// =============================================================================
// WAIT HELPER
// =============================================================================

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

/// Synchronization primitives bound to one session
#[derive(Clone)]
pub struct WaitHelper {
    driver: Arc<dyn Driver>,
    logger: Arc<Logger>,
    options: WaitOptions,
}

impl std::fmt::Debug for WaitHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitHelper")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl WaitHelper {
    /// Create a wait helper with default options
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>, logger: Arc<Logger>) -> Self {
        Self {
            driver,
            logger,
            options: WaitOptions::default(),
        }
    }

    /// Set default options
    #[must_use]
    pub const fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Default options
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Wait until `locator` is attached and visible.
    ///
    /// # Errors
    ///
    /// `ElementNotFound` when the element does not appear within `timeout`
    /// (or the driver does not answer within it). Other driver errors are
    /// returned unchanged. Both are logged at ERROR first.
    pub async fn wait_for_element(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> ProbeResult<WaitResult> {
        let start = Instant::now();
        self.logger.debug(format!(
            "Waiting for element: {locator} (timeout {}ms)",
            millis(timeout)
        ));

        let outcome =
            tokio::time::timeout(timeout, self.driver.wait_for_selector(locator, timeout)).await;
        let elapsed = start.elapsed();

        let error = match outcome {
            Ok(Ok(())) => {
                self.logger
                    .debug(format!("Element visible: {locator} after {}ms", millis(elapsed)));
                return Ok(WaitResult::new(elapsed, locator.to_string()));
            }
            Ok(Err(ProbeError::Timeout { .. })) | Err(_) => ProbeError::ElementNotFound {
                locator: locator.to_string(),
                elapsed_ms: millis(elapsed),
            },
            Ok(Err(other)) => other,
        };

        self.logger.error_with(
            format!("Element wait failed: {locator}: {error}"),
            json!({ "error": error.to_string(), "elapsed_ms": millis(elapsed) }),
        );
        Err(error)
    }

    /// Run `action` while waiting for the network to settle.
    ///
    /// The action and the settle wait are polled together, action first, so
    /// a navigation started by the action is observed by the settle wait.
    /// This never fails on its own: a settle timeout is logged at WARN and
    /// the action's result is handed back for the caller to decide on.
    pub async fn wait_for_navigation<F, T>(
        &self,
        action: F,
        timeout: Duration,
    ) -> NavigationOutcome<T>
    where
        F: Future<Output = ProbeResult<T>>,
    {
        let start = Instant::now();
        let settle = async {
            match tokio::time::timeout(timeout, self.driver.wait_for_network_idle(timeout)).await
            {
                Ok(Ok(())) => Settle::Settled,
                Ok(Err(ProbeError::Timeout { .. })) | Err(_) => Settle::TimedOut,
                Ok(Err(other)) => Settle::Failed(other.to_string()),
            }
        };

        let (action, settle) = tokio::join!(action, settle);
        let elapsed = start.elapsed();

        match &settle {
            Settle::Settled => self
                .logger
                .debug(format!("Navigation settled after {}ms", millis(elapsed))),
            Settle::TimedOut => self.logger.warn(
                ProbeError::NavigationSettleTimeout {
                    timeout_ms: millis(timeout),
                }
                .to_string(),
            ),
            Settle::Failed(message) => self
                .logger
                .warn(format!("Navigation settle could not be observed: {message}")),
        }

        NavigationOutcome {
            action,
            settle,
            elapsed,
        }
    }

    /// Poll `predicate` until it holds.
    ///
    /// # Errors
    ///
    /// `ConditionTimeout` when the predicate is still false (or still
    /// running) once `timeout` has elapsed.
    pub async fn wait_for_condition<F, Fut>(
        &self,
        description: &str,
        mut predicate: F,
        timeout: Duration,
    ) -> ProbeResult<WaitResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let start = Instant::now();
        let deadline = start + timeout;
        self.logger.debug(format!(
            "Waiting for condition: {description} (timeout {}ms)",
            millis(timeout)
        ));

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if matches!(tokio::time::timeout(remaining, predicate()).await, Ok(true)) {
                let elapsed = start.elapsed();
                self.logger.debug(format!(
                    "Condition met: {description} after {}ms",
                    millis(elapsed)
                ));
                return Ok(WaitResult::new(elapsed, description));
            }
            if Instant::now() >= deadline {
                break;
            }
            let pause = self
                .options
                .poll_interval()
                .min(deadline.saturating_duration_since(Instant::now()));
            tokio::time::sleep(pause).await;
        }

        let error = ProbeError::ConditionTimeout {
            condition: description.to_string(),
            elapsed_ms: millis(start.elapsed()),
        };
        self.logger.error(error.to_string());
        Err(error)
    }

    /// Poll a script in the page until it evaluates truthy.
    ///
    /// Evaluation errors count as "not yet".
    ///
    /// # Errors
    ///
    /// `ConditionTimeout` as for [`Self::wait_for_condition`].
    pub async fn wait_for_function(
        &self,
        script: &str,
        timeout: Duration,
    ) -> ProbeResult<WaitResult> {
        let driver = &self.driver;
        self.wait_for_condition(
            &format!("function `{script}`"),
            move || async move {
                driver
                    .evaluate(script)
                    .await
                    .map(|value| is_truthy(&value))
                    .unwrap_or(false)
            },
            timeout,
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;
    use crate::mock::{MockDriver, MockElement};

    fn setup() -> (Arc<MockDriver>, WaitHelper, Arc<Logger>) {
        let driver = Arc::new(MockDriver::new());
        let logger = Arc::new(Logger::in_memory(LogLevel::Debug));
        let waits = WaitHelper::new(driver.clone(), logger.clone());
        (driver, waits, logger)
    }

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = WaitOptions::new();
            assert_eq!(opts.timeout(), Duration::from_millis(30_000));
            assert_eq!(opts.poll_interval(), Duration::from_millis(50));
        }

        #[test]
        fn test_builder() {
            let opts = WaitOptions::new().with_timeout(1_000).with_poll_interval(5);
            assert_eq!(opts.timeout_ms, 1_000);
            assert_eq!(opts.poll_interval_ms, 5);
        }
    }

    mod element_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_element_appearing_before_timeout() {
            let (driver, waits, _) = setup();
            driver.add_element(
                "#late",
                MockElement::visible_after(Duration::from_millis(400)),
            );
            let result = waits
                .wait_for_element(&Locator::css("#late"), Duration::from_secs(1))
                .await
                .unwrap();
            assert!(result.elapsed >= Duration::from_millis(400));
            assert!(result.elapsed < Duration::from_secs(1));
            assert_eq!(result.waited_for, "#late");
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_element_fails_within_budget() {
            let (_, waits, logger) = setup();
            let start = Instant::now();
            let err = waits
                .wait_for_element(&Locator::css("#never"), Duration::from_millis(500))
                .await
                .unwrap_err();
            let elapsed = start.elapsed();
            assert!(matches!(
                err,
                ProbeError::ElementNotFound { ref locator, .. } if locator == "#never"
            ));
            assert!(elapsed >= Duration::from_millis(500));
            assert!(elapsed < Duration::from_millis(600));
            assert!(logger.contains(LogLevel::Error, "#never"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_hung_driver_is_bounded() {
            let (driver, waits, _) = setup();
            driver.hang_on("wait_for_selector");
            let err = waits
                .wait_for_element(&Locator::css("#x"), Duration::from_millis(200))
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::ElementNotFound { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_other_driver_errors_pass_through() {
            let (driver, waits, logger) = setup();
            driver.fail_on("wait_for_selector", "target closed");
            let err = waits
                .wait_for_element(&Locator::css("#x"), Duration::from_millis(200))
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::Driver { .. }));
            assert!(logger.contains(LogLevel::Error, "Element wait failed: "));
            assert!(logger.contains(LogLevel::Error, "target closed"));
        }
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_settles_after_request() {
            let (driver, waits, _) = setup();
            let d = driver.clone();
            let outcome = waits
                .wait_for_navigation(
                    async move {
                        d.set_network_busy(Duration::from_millis(200));
                        Ok(42)
                    },
                    Duration::from_secs(5),
                )
                .await;
            assert!(outcome.is_settled());
            assert!(outcome.elapsed >= Duration::from_millis(200 + NETWORK_IDLE_THRESHOLD_MS));
            assert_eq!(outcome.into_result().unwrap(), 42);
        }

        #[tokio::test(start_paused = true)]
        async fn test_timeout_warns_and_returns() {
            let (driver, waits, logger) = setup();
            driver.set_network_busy(Duration::from_secs(60));
            let outcome = waits
                .wait_for_navigation(async { Ok(()) }, Duration::from_millis(300))
                .await;
            assert_eq!(outcome.settle, Settle::TimedOut);
            assert!(outcome.action.is_ok());
            assert!(logger.contains(LogLevel::Warn, "did not settle"));
            assert!(logger.entries_at(LogLevel::Error).is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_action_error_is_handed_back() {
            let (_, waits, logger) = setup();
            let outcome: NavigationOutcome<()> = waits
                .wait_for_navigation(
                    async { Err(ProbeError::driver("click", "detached")) },
                    Duration::from_millis(300),
                )
                .await;
            assert!(outcome.is_settled());
            assert!(matches!(outcome.action, Err(ProbeError::Driver { .. })));
            assert!(logger.entries_at(LogLevel::Warn).is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_hung_settle_is_bounded() {
            let (driver, waits, _) = setup();
            driver.hang_on("wait_for_network_idle");
            let outcome = waits
                .wait_for_navigation(async { Ok(()) }, Duration::from_millis(300))
                .await;
            assert_eq!(outcome.settle, Settle::TimedOut);
        }
    }

    mod condition_tests {
        use super::*;
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[tokio::test(start_paused = true)]
        async fn test_condition_becomes_true() {
            let (_, waits, _) = setup();
            let counter = AtomicUsize::new(0);
            let calls = &counter;
            let result = waits
                .wait_for_condition(
                    "third poll",
                    move || async move { calls.fetch_add(1, Ordering::SeqCst) >= 2 },
                    Duration::from_secs(1),
                )
                .await
                .unwrap();
            assert_eq!(calls.load(Ordering::SeqCst), 3);
            assert_eq!(result.waited_for, "third poll");
        }

        #[tokio::test(start_paused = true)]
        async fn test_condition_timeout() {
            let (_, waits, logger) = setup();
            let err = waits
                .wait_for_condition("never", || async { false }, Duration::from_millis(200))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                ProbeError::ConditionTimeout { ref condition, elapsed_ms }
                    if condition == "never" && elapsed_ms >= 200
            ));
            assert!(logger.contains(LogLevel::Error, "never"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_function_wait_uses_truthiness() {
            let (driver, waits, _) = setup();
            driver.schedule(Duration::from_millis(100), |page| {
                page.set_eval_result("window.ready", serde_json::json!(true));
            });
            let result = waits
                .wait_for_function("window.ready", Duration::from_secs(1))
                .await
                .unwrap();
            assert!(result.elapsed >= Duration::from_millis(100));
        }
    }
}
