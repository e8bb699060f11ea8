//! Page Object Model
//!
//! [`BasePage`] is the single error-observation point between page objects
//! and the driver: every primitive logs its intent at DEBUG, then either its
//! outcome at INFO or the failure at ERROR, and hands driver errors back
//! unchanged. Concrete pages compose a `BasePage` with a [`LocatorTable`] and
//! implement [`PageObject`].

use crate::config::HarnessConfig;
use crate::driver::Driver;
use crate::locator::Locator;
use crate::logger::Logger;
use crate::result::ProbeResult;
use crate::screenshot::{Artifact, ScreenshotCapturer};
use crate::wait::{WaitHelper, WaitResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Result of a visibility probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Attached and rendered
    Visible,
    /// Absent or not rendered
    Hidden,
    /// The driver could not answer
    Fault(String),
}

impl Visibility {
    /// Collapse to the boolean contract (faults read as not visible)
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        matches!(self, Self::Visible)
    }
}

// =============================================================================
// LOCATOR TABLE
// =============================================================================

/// Named locators of one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorTable {
    locators: BTreeMap<String, Locator>,
}

impl LocatorTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a locator, naming it for logs
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, locator: Locator) -> Self {
        let name = name.into();
        let _ = self
            .locators
            .insert(name.clone(), locator.named(name.replace('_', " ")));
        self
    }

    /// Look up a locator
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Locator> {
        self.locators.get(name)
    }

    /// Names in sorted order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.locators.keys().map(String::as_str).collect()
    }

    /// Number of locators
    #[must_use]
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

// =============================================================================
// BASE PAGE
// =============================================================================

/// Driver handle plus the services every page needs
#[derive(Clone)]
pub struct BasePage {
    driver: Arc<dyn Driver>,
    waits: WaitHelper,
    logger: Arc<Logger>,
    capturer: Arc<ScreenshotCapturer>,
    config: Arc<HarnessConfig>,
}

impl std::fmt::Debug for BasePage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasePage")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl BasePage {
    /// Bind to one session
    #[must_use]
    pub fn new(
        driver: Arc<dyn Driver>,
        logger: Arc<Logger>,
        capturer: Arc<ScreenshotCapturer>,
        config: Arc<HarnessConfig>,
    ) -> Self {
        let waits = WaitHelper::new(Arc::clone(&driver), Arc::clone(&logger));
        Self {
            driver,
            waits,
            logger,
            capturer,
            config,
        }
    }

    /// Session driver
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Wait helper bound to the same session
    #[must_use]
    pub const fn waits(&self) -> &WaitHelper {
        &self.waits
    }

    /// Logger
    #[must_use]
    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    /// Harness configuration
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Default element wait budget
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.config.default_timeout()
    }

    async fn observe<T, F>(&self, action: &str, target: &str, operation: F) -> ProbeResult<T>
    where
        F: Future<Output = ProbeResult<T>>,
    {
        self.logger.debug(format!("{action}: {target}"));
        match operation.await {
            Ok(value) => {
                self.logger.info(format!("{action} done: {target}"));
                Ok(value)
            }
            Err(e) => {
                self.logger.error_with(
                    format!("{action} failed: {target}"),
                    json!({ "error": e.to_string() }),
                );
                Err(e)
            }
        }
    }

    /// Go to `path` (relative to the base URL, or absolute)
    pub async fn navigate(&self, path: &str) -> ProbeResult<()> {
        let url = self.config.url_for(path);
        self.observe("Navigate", &url, self.driver.goto(&url)).await
    }

    /// Click an element
    pub async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        self.observe("Click", &describe(locator), self.driver.click(locator))
            .await
    }

    /// Replace an input's value
    pub async fn fill(&self, locator: &Locator, text: &str) -> ProbeResult<()> {
        self.observe("Fill", &describe(locator), self.driver.fill(locator, text))
            .await
    }

    /// Text content of an element
    pub async fn read_text(&self, locator: &Locator) -> ProbeResult<Option<String>> {
        self.observe(
            "Read text",
            &describe(locator),
            self.driver.text_content(locator),
        )
        .await
    }

    /// Press a key on the focused element
    pub async fn press(&self, key: &str) -> ProbeResult<()> {
        self.observe("Press", key, self.driver.press(key)).await
    }

    /// Reload the page
    pub async fn reload(&self) -> ProbeResult<()> {
        self.observe("Reload", "current page", self.driver.reload())
            .await
    }

    /// Probe visibility without collapsing faults
    pub async fn probe_visibility(&self, locator: &Locator) -> Visibility {
        match self.driver.is_visible(locator).await {
            Ok(true) => Visibility::Visible,
            Ok(false) => Visibility::Hidden,
            Err(e) => Visibility::Fault(e.to_string()),
        }
    }

    /// Whether an element is visible right now. Never fails; driver faults
    /// are logged at WARN and read as `false`.
    pub async fn is_visible(&self, locator: &Locator) -> bool {
        let visibility = self.probe_visibility(locator).await;
        if let Visibility::Fault(message) = &visibility {
            self.logger.warn(format!(
                "Visibility check failed for {}: {message}",
                describe(locator)
            ));
        }
        visibility.is_visible()
    }

    /// Wait for an element to become visible
    pub async fn wait_for(&self, locator: &Locator, timeout: Duration) -> ProbeResult<WaitResult> {
        self.waits.wait_for_element(locator, timeout).await
    }

    /// Capture the viewport. The capturer logs the outcome.
    pub async fn screenshot(&self, name: &str) -> ProbeResult<Artifact> {
        self.logger.debug(format!("Screenshot: {name}"));
        self.capturer
            .capture_screenshot(self.driver.as_ref(), name)
            .await
    }

    /// Capture the whole page
    pub async fn full_page_screenshot(&self, name: &str) -> ProbeResult<Artifact> {
        self.logger.debug(format!("Full page screenshot: {name}"));
        self.capturer
            .capture_full_page(self.driver.as_ref(), name)
            .await
    }

    /// Document title
    pub async fn title(&self) -> ProbeResult<String> {
        self.observe("Read title", "document", self.driver.title())
            .await
    }

    /// Current URL
    pub async fn current_url(&self) -> ProbeResult<String> {
        self.observe("Read URL", "current page", self.driver.url())
            .await
    }
}

fn describe(locator: &Locator) -> String {
    match locator.name() {
        Some(name) => format!("{name} ({locator})"),
        None => locator.to_string(),
    }
}

// =============================================================================
// PAGE OBJECT TRAIT
// =============================================================================

/// A page of the application under test
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Page name for logs
    fn page_name(&self) -> &str;

    /// URL path pattern of the page (e.g. `/web/index.php/auth/login`)
    fn url_pattern(&self) -> &str;

    /// Element whose visibility means the page is ready
    fn ready_locator(&self) -> &Locator;

    /// Shared primitives
    fn base(&self) -> &BasePage;

    /// Whether the ready element is visible now
    async fn is_loaded(&self) -> bool {
        self.base().is_visible(self.ready_locator()).await
    }

    /// Whether the current URL matches [`Self::url_pattern`]
    async fn is_current(&self) -> bool {
        match self.base().current_url().await {
            Ok(url) => UrlMatcher::new(self.url_pattern()).matches(&url),
            Err(e) => {
                self.base()
                    .logger()
                    .warn(format!("Cannot read URL for {}: {e}", self.page_name()));
                false
            }
        }
    }

    /// Wait for the ready element
    async fn wait_until_loaded(&self, timeout: Duration) -> ProbeResult<WaitResult> {
        self.base().wait_for(self.ready_locator(), timeout).await
    }
}

// =============================================================================
// URL MATCHING
// =============================================================================

/// Path part of a URL: no scheme, host, query or fragment
#[must_use]
pub fn url_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(i) => {
            let after = &url[i + 3..];
            after.find('/').map_or("", |j| &after[j..])
        }
        None => url,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

/// URL pattern matcher for page objects
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

impl UrlMatcher {
    /// Create a matcher.
    ///
    /// Patterns support literal segments (`/auth/login`), wildcards
    /// (`/dashboard/*`) and named parameters (`/users/:id`).
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = url_path(pattern)
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    fn path_segments(url: &str) -> Vec<&str> {
        url_path(url).split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Whether a URL (absolute or path-only) matches.
    ///
    /// Wildcards and parameters each consume exactly one segment.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let url_segments = Self::path_segments(url);
        url_segments.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(&url_segments)
                .all(|(segment, actual)| match segment {
                    UrlSegment::Literal(lit) => lit == actual,
                    UrlSegment::Wildcard | UrlSegment::Parameter(_) => true,
                })
    }

    /// Named parameters captured from a URL
    #[must_use]
    pub fn extract_params(&self, url: &str) -> HashMap<String, String> {
        self.segments
            .iter()
            .zip(Self::path_segments(url))
            .filter_map(|(segment, value)| match segment {
                UrlSegment::Parameter(name) => Some((name.clone(), value.to_string())),
                _ => None,
            })
            .collect()
    }

    /// Original pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}
