//! authprobe: Page-Object UI Test Harness for Web Authentication Flows
//!
//! Drives a login application through typed page objects, waits on the page
//! instead of sleeping, logs every interaction, captures screenshots when a
//! test fails and runs data-driven scenario tables with per-test isolation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        AUTHPROBE Architecture                       │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌────────────┐  │
//! │  │ Test data  │──►│ Executor   │──►│ Scenario   │──►│ Page       │  │
//! │  │ (TestCase) │   │ (sessions, │   │ (login,    │   │ objects    │  │
//! │  └────────────┘   │  retries)  │   │  logout)   │   └─────┬──────┘  │
//! │                   └─────┬──────┘   └────────────┘         │         │
//! │                         │                          ┌──────▼──────┐  │
//! │                   ┌─────▼──────┐                   │ WaitHelper  │  │
//! │                   │ Lifecycle  │──► Listener       └──────┬──────┘  │
//! │                   │ hooks      │──► Reporter              │         │
//! │                   └─────┬──────┘                   ┌──────▼──────┐  │
//! │                         └──► Screenshots ◄─────────│ Driver      │  │
//! │                                                    │ (mock / CDP)│  │
//! │                     Logger (console + file)        └─────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use authprobe::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> ProbeResult<()> {
//! let config = Arc::new(HarnessConfig::default());
//! let logger = Arc::new(Logger::new(LoggerConfig::default()));
//! let capturer = Arc::new(ScreenshotCapturer::new(&config.screenshots_dir, logger.clone()));
//! let lifecycle = Arc::new(TestLifecycle::new(logger, capturer, &config));
//! let sessions = Arc::new(MockSessionFactory::login_app(LoginAppConfig::from_harness(&config)));
//!
//! let executor = DataDrivenExecutor::new(sessions, lifecycle, config, ExecutorOptions::new());
//! let report = executor
//!     .run_suite("login", &SuiteKind::Login.scenarios(&canonical_login_cases()))
//!     .await;
//! assert!(report.success());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_frames))]

mod browser;
mod config;
mod data;
mod driver;
mod executor;
mod lifecycle;
mod listener;
mod locator;
mod logger;
mod page_object;
mod reporter;
mod result;
mod scenarios;
mod screenshot;
mod wait;

/// Scripted in-memory driver and simulated login application
pub mod mock;

/// Concrete page objects
pub mod pages;

pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumSessionFactory};
pub use config::{
    Credentials, HarnessConfig, ReportPaths, BASE_URL_ENV, DEFAULT_BASE_URL, DEFAULT_LOGIN_PATH,
    LOG_LEVEL_ENV,
};
pub use data::{canonical_login_cases, duplicate_ids, TestCase, TestDataProvider};
pub use driver::{
    is_truthy, ConsoleKind, ConsoleMessage, Driver, PageEvent, PageEventHandler, SessionFactory,
};
pub use executor::{DataDrivenExecutor, ExecutorOptions, SuiteReport, DEFAULT_TEST_TIMEOUT};
pub use lifecycle::{TestInfo, TestLifecycle};
pub use listener::{TestListener, TestRunStats};
pub use locator::{Locator, Selector};
pub use logger::{log_file_path, LogEntry, LogLevel, Logger, LoggerConfig, DEFAULT_HISTORY_LIMIT};
pub use page_object::{url_path, BasePage, LocatorTable, PageObject, UrlMatcher, Visibility};
pub use reporter::{Reporter, RunReport, TestOutcome, TestStatus, JUNIT_FILE, RESULTS_FILE};
pub use result::{ProbeError, ProbeResult};
pub use scenarios::{
    LoginScenario, LogoutScenario, Scenario, ScenarioContext, SessionScenario, SuiteKind,
    DASHBOARD_TIMEOUT,
};
pub use screenshot::{artifact_file_name, sanitize_name, Artifact, ScreenshotCapturer};
pub use wait::{
    NavigationOutcome, Settle, WaitHelper, WaitOptions, WaitResult, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS, NETWORK_IDLE_THRESHOLD_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::browser::*;
    pub use super::config::*;
    pub use super::data::*;
    pub use super::driver::*;
    pub use super::executor::*;
    pub use super::lifecycle::*;
    pub use super::listener::*;
    pub use super::locator::*;
    pub use super::logger::*;
    pub use super::mock::{LoginAppConfig, MockDriver, MockElement, MockSessionFactory};
    pub use super::page_object::*;
    pub use super::pages::*;
    pub use super::reporter::*;
    pub use super::result::*;
    pub use super::scenarios::*;
    pub use super::screenshot::*;
    pub use super::wait::*;
}
