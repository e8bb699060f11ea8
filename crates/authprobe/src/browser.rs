//! Browser control over the Chrome DevTools Protocol.
//!
//! With the `browser` feature, [`ChromiumDriver`] implements [`Driver`] on a
//! chromiumoxide page and [`ChromiumSessionFactory`] launches one browser per
//! session. Without the feature only [`BrowserConfig`] is available.
//!
//! [`Driver`]: crate::driver::Driver

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Browser launch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Auto-wait budget of click and fill
    pub action_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
            action_timeout_ms: 5_000,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Auto-wait budget of click and fill
    #[must_use]
    pub const fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }
}

// ============================================================================
// CDP implementation
// ============================================================================

#[cfg(feature = "browser")]
#[allow(clippy::significant_drop_tightening, clippy::items_after_statements)]
mod cdp {
    use super::BrowserConfig;
    use crate::driver::{
        ConsoleKind, ConsoleMessage, Driver, PageEvent, PageEventHandler, SessionFactory,
    };
    use crate::locator::Locator;
    use crate::result::{ProbeError, ProbeResult};
    use crate::wait::{DEFAULT_POLL_INTERVAL_MS, NETWORK_IDLE_THRESHOLD_MS};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchKeyEventParams, DispatchKeyEventType,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams, EventFrameNavigated,
    };
    use chromiumoxide::cdp::js_protocol::runtime::{
        ConsoleApiCalledType, EventConsoleApiCalled, EventExceptionThrown,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tokio::time::Instant;

    fn driver_err(operation: &str) -> impl Fn(chromiumoxide::error::CdpError) -> ProbeError + '_ {
        move |e| ProbeError::driver(operation, e.to_string())
    }

    /// One launched browser with a single page
    #[derive(Debug)]
    pub struct ChromiumDriver {
        config: BrowserConfig,
        browser: Mutex<CdpBrowser>,
        page: CdpPage,
        handle: tokio::task::JoinHandle<()>,
    }

    impl ChromiumDriver {
        /// Launch a browser and open a blank page
        ///
        /// # Errors
        ///
        /// `Session` if the browser cannot be launched or the page opened.
        pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
            let session_err = |e: String| ProbeError::Session { message: e };

            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);
            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            let cdp_config = builder.build().map_err(session_err)?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| session_err(e.to_string()))?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| session_err(e.to_string()))?;

            Ok(Self {
                config,
                browser: Mutex::new(browser),
                page,
                handle,
            })
        }

        /// Launch configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        async fn eval(&self, operation: &str, script: &str) -> ProbeResult<serde_json::Value> {
            let result = self
                .page
                .evaluate(script)
                .await
                .map_err(driver_err(operation))?;
            Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
        }

        async fn wait_visible(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
            let deadline = Instant::now() + timeout;
            loop {
                if self.is_visible(locator).await? {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    return Err(ProbeError::Timeout {
                        ms: timeout.as_millis() as u64,
                    });
                }
                tokio::time::sleep(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)).await;
            }
        }
    }

    fn with_element(locator: &Locator, body: &str) -> String {
        format!(
            "(() => {{ const el = {}; if (!el) return null; {body} }})()",
            locator.selector().to_query()
        )
    }

    const fn console_kind(kind: &ConsoleApiCalledType) -> ConsoleKind {
        match kind {
            ConsoleApiCalledType::Error | ConsoleApiCalledType::Assert => ConsoleKind::Error,
            ConsoleApiCalledType::Warning => ConsoleKind::Warning,
            ConsoleApiCalledType::Info => ConsoleKind::Info,
            ConsoleApiCalledType::Debug => ConsoleKind::Debug,
            _ => ConsoleKind::Log,
        }
    }

    #[async_trait]
    impl Driver for ChromiumDriver {
        async fn goto(&self, url: &str) -> ProbeResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| ProbeError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn click(&self, locator: &Locator) -> ProbeResult<()> {
            self.wait_visible(locator, self.config.action_timeout()).await?;
            match locator.selector().as_css() {
                Some(css) => {
                    let element = self
                        .page
                        .find_element(css)
                        .await
                        .map_err(driver_err("click"))?;
                    element.click().await.map_err(driver_err("click"))?;
                }
                None => {
                    self.eval("click", &with_element(locator, "el.click(); return true;"))
                        .await?;
                }
            }
            Ok(())
        }

        async fn fill(&self, locator: &Locator, text: &str) -> ProbeResult<()> {
            self.wait_visible(locator, self.config.action_timeout()).await?;
            self.eval(
                "fill",
                &with_element(
                    locator,
                    "el.focus(); el.value = ''; \
                     el.dispatchEvent(new Event('input', { bubbles: true })); return true;",
                ),
            )
            .await?;
            if text.is_empty() {
                return Ok(());
            }
            match locator.selector().as_css() {
                Some(css) => {
                    let element = self
                        .page
                        .find_element(css)
                        .await
                        .map_err(driver_err("fill"))?;
                    element.type_str(text).await.map_err(driver_err("fill"))?;
                }
                None => {
                    let body = format!(
                        "el.value = {text:?}; \
                         el.dispatchEvent(new Event('input', {{ bubbles: true }})); return true;"
                    );
                    self.eval("fill", &with_element(locator, &body)).await?;
                }
            }
            Ok(())
        }

        async fn text_content(&self, locator: &Locator) -> ProbeResult<Option<String>> {
            let value = self
                .eval("text_content", &with_element(locator, "return el.textContent;"))
                .await?;
            Ok(value.as_str().map(str::to_string))
        }

        async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
            let value = self
                .eval(
                    "is_visible",
                    &with_element(
                        locator,
                        "const s = getComputedStyle(el); const r = el.getBoundingClientRect(); \
                         return s.visibility !== 'hidden' && s.display !== 'none' \
                         && (r.width > 0 || r.height > 0);",
                    ),
                )
                .await?;
            Ok(value.as_bool().unwrap_or(false))
        }

        async fn wait_for_selector(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
            self.wait_visible(locator, timeout).await
        }

        async fn wait_for_network_idle(&self, timeout: Duration) -> ProbeResult<()> {
            const SNAPSHOT: &str =
                "[document.readyState, performance.getEntriesByType('resource').length]";
            let idle_for = Duration::from_millis(NETWORK_IDLE_THRESHOLD_MS);
            let deadline = Instant::now() + timeout;
            let mut last: Option<serde_json::Value> = None;
            let mut stable_since = Instant::now();
            loop {
                let now = Instant::now();
                let snapshot = self.eval("wait_for_network_idle", SNAPSHOT).await?;
                let complete = snapshot.get(0).and_then(|v| v.as_str()) == Some("complete");
                if last.as_ref() != Some(&snapshot) || !complete {
                    stable_since = now;
                    last = Some(snapshot);
                } else if now.duration_since(stable_since) >= idle_for {
                    return Ok(());
                }
                if now >= deadline {
                    return Err(ProbeError::Timeout {
                        ms: timeout.as_millis() as u64,
                    });
                }
                tokio::time::sleep(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)).await;
            }
        }

        async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>> {
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .capture_beyond_viewport(full_page)
                .build();
            let screenshot = self
                .page
                .execute(params)
                .await
                .map_err(driver_err("screenshot"))?;

            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| ProbeError::driver("screenshot", e.to_string()))
        }

        async fn title(&self) -> ProbeResult<String> {
            Ok(self
                .page
                .get_title()
                .await
                .map_err(driver_err("title"))?
                .unwrap_or_default())
        }

        async fn url(&self) -> ProbeResult<String> {
            Ok(self
                .page
                .url()
                .await
                .map_err(driver_err("url"))?
                .unwrap_or_default())
        }

        async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value> {
            self.eval("evaluate", script).await
        }

        async fn press(&self, key: &str) -> ProbeResult<()> {
            let key_err = |e: String| ProbeError::driver("press", e);
            for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
                let mut builder = DispatchKeyEventParams::builder().r#type(kind).key(key);
                if key == "Enter" {
                    builder = builder.text("\r");
                }
                let params = builder.build().map_err(key_err)?;
                self.page.execute(params).await.map_err(driver_err("press"))?;
            }
            Ok(())
        }

        async fn reload(&self) -> ProbeResult<()> {
            self.page.reload().await.map_err(driver_err("reload"))?;
            Ok(())
        }

        fn subscribe(&self, handler: PageEventHandler) {
            let page = self.page.clone();
            let on_navigate = Arc::clone(&handler);
            tokio::spawn(async move {
                let Ok(mut events) = page.event_listener::<EventFrameNavigated>().await else {
                    return;
                };
                while let Some(event) = events.next().await {
                    // main frame only
                    if event.frame.parent_id.is_none() {
                        on_navigate(&PageEvent::Navigated(event.frame.url.clone()));
                    }
                }
            });

            let page = self.page.clone();
            let on_error = Arc::clone(&handler);
            tokio::spawn(async move {
                let Ok(mut events) = page.event_listener::<EventExceptionThrown>().await else {
                    return;
                };
                while let Some(event) = events.next().await {
                    let details = &event.exception_details;
                    let message = details
                        .exception
                        .as_ref()
                        .and_then(|e| e.description.clone())
                        .unwrap_or_else(|| details.text.clone());
                    on_error(&PageEvent::PageError(message));
                }
            });

            let page = self.page.clone();
            tokio::spawn(async move {
                let Ok(mut events) = page.event_listener::<EventConsoleApiCalled>().await else {
                    return;
                };
                while let Some(event) = events.next().await {
                    let text = event
                        .args
                        .iter()
                        .filter_map(|arg| {
                            arg.value
                                .as_ref()
                                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                                .or_else(|| arg.description.clone())
                        })
                        .collect::<Vec<_>>()
                        .join(" ");
                    handler(&PageEvent::Console(ConsoleMessage::new(
                        console_kind(&event.r#type),
                        text,
                    )));
                }
            });
        }

        async fn close(&self) -> ProbeResult<()> {
            let result = self.browser.lock().await.close().await;
            self.handle.abort();
            result.map(|_| ()).map_err(driver_err("close"))
        }
    }

    /// Launches a fresh browser for every session
    #[derive(Debug, Clone, Default)]
    pub struct ChromiumSessionFactory {
        config: BrowserConfig,
    }

    impl ChromiumSessionFactory {
        /// Factory launching browsers with `config`
        #[must_use]
        pub const fn new(config: BrowserConfig) -> Self {
            Self { config }
        }
    }

    #[async_trait]
    impl SessionFactory for ChromiumSessionFactory {
        async fn open(&self) -> ProbeResult<Arc<dyn Driver>> {
            let driver = ChromiumDriver::launch(self.config.clone()).await?;
            Ok(Arc::new(driver))
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumDriver, ChromiumSessionFactory};
