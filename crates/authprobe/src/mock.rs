//! Mock driver for unit and scenario testing
//!
//! [`MockDriver`] keeps an in-memory page: a URL, a title and a set of
//! elements keyed by selector, each with a time at which it becomes visible.
//! State changes can be scheduled in the future, so waits observe the same
//! "eventually true" behavior a real browser shows. Time is `tokio::time`,
//! which makes every test deterministic under a paused runtime.
//!
//! [`LoginApp`] scripts the authentication flow of the target application on
//! top of it: login form, credential check, error banner, dashboard, user
//! menu and logout.

use crate::config::{Credentials, HarnessConfig, DEFAULT_BASE_URL, DEFAULT_LOGIN_PATH};
use crate::driver::{
    ConsoleKind, ConsoleMessage, Driver, PageEvent, PageEventHandler, SessionFactory,
};
use crate::locator::Locator;
use crate::pages::home::{self, DASHBOARD_PATH};
use crate::pages::login;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::NETWORK_IDLE_THRESHOLD_MS;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Polling interval of mock waits
pub const MOCK_POLL_INTERVAL_MS: u64 = 10;

/// How long mock actions wait for their target to become actionable
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MOCK PAGE
// =============================================================================

/// An element in the mock page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Text content
    pub text: Option<String>,
    /// Input value
    pub value: String,
    /// When the element becomes visible (`None` = attached but hidden)
    pub visible_at: Option<Instant>,
}

impl MockElement {
    /// Element visible immediately
    #[must_use]
    pub fn visible() -> Self {
        Self {
            text: None,
            value: String::new(),
            visible_at: Some(Instant::now()),
        }
    }

    /// Element that becomes visible after `delay`
    #[must_use]
    pub fn visible_after(delay: Duration) -> Self {
        Self {
            text: None,
            value: String::new(),
            visible_at: Some(Instant::now() + delay),
        }
    }

    /// Attached element that is not rendered
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            text: None,
            value: String::new(),
            visible_at: None,
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Whether the element is visible at `now`
    #[must_use]
    pub fn is_visible_at(&self, now: Instant) -> bool {
        self.visible_at.is_some_and(|at| at <= now)
    }
}

type Transition = Box<dyn FnOnce(&mut MockPage) + Send>;

struct Scheduled {
    at: Instant,
    seq: u64,
    apply: Transition,
}

/// In-memory page state manipulated by the mock driver and mock apps
pub struct MockPage {
    url: String,
    title: String,
    elements: HashMap<String, MockElement>,
    cookies: HashMap<String, String>,
    eval_results: HashMap<String, serde_json::Value>,
    network_busy_until: Option<Instant>,
    idle_threshold: Duration,
    scheduled: Vec<Scheduled>,
    next_seq: u64,
    events: Vec<PageEvent>,
}

impl std::fmt::Debug for MockPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPage")
            .field("url", &self.url)
            .field("title", &self.title)
            .field("elements", &self.elements.len())
            .field("scheduled", &self.scheduled.len())
            .finish_non_exhaustive()
    }
}

impl Default for MockPage {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
            title: String::new(),
            elements: HashMap::new(),
            cookies: HashMap::new(),
            eval_results: HashMap::new(),
            network_busy_until: None,
            idle_threshold: Duration::from_millis(NETWORK_IDLE_THRESHOLD_MS),
            scheduled: Vec::new(),
            next_seq: 0,
            events: Vec::new(),
        }
    }
}

impl MockPage {
    /// Current URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Change the URL and report a navigation event
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
        self.events.push(PageEvent::Navigated(self.url.clone()));
    }

    /// Document title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Set the document title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Insert or replace an element
    pub fn insert(&mut self, key: impl Into<String>, element: MockElement) {
        let _ = self.elements.insert(key.into(), element);
    }

    /// Remove an element
    pub fn remove(&mut self, key: &str) -> Option<MockElement> {
        self.elements.remove(key)
    }

    /// Remove every element
    pub fn clear_elements(&mut self) {
        self.elements.clear();
    }

    /// Look up an element
    #[must_use]
    pub fn element(&self, key: &str) -> Option<&MockElement> {
        self.elements.get(key)
    }

    /// Make an attached element visible after `delay`
    pub fn show(&mut self, key: &str, delay: Duration) {
        if let Some(el) = self.elements.get_mut(key) {
            el.visible_at = Some(Instant::now() + delay);
        }
    }

    /// Hide an attached element
    pub fn hide(&mut self, key: &str) {
        if let Some(el) = self.elements.get_mut(key) {
            el.visible_at = None;
        }
    }

    /// Whether `key` is visible at `now`
    #[must_use]
    pub fn is_visible(&self, key: &str, now: Instant) -> bool {
        self.elements.get(key).is_some_and(|el| el.is_visible_at(now))
    }

    /// Input value of an element (empty when absent)
    #[must_use]
    pub fn value_of(&self, key: &str) -> &str {
        self.elements.get(key).map_or("", |el| el.value.as_str())
    }

    /// Set a cookie
    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let _ = self.cookies.insert(name.into(), value.into());
    }

    /// Read a cookie
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Delete a cookie
    pub fn clear_cookie(&mut self, name: &str) {
        let _ = self.cookies.remove(name);
    }

    /// Register the value returned by `evaluate(script)`
    pub fn set_eval_result(&mut self, script: impl Into<String>, value: serde_json::Value) {
        let _ = self.eval_results.insert(script.into(), value);
    }

    /// Mark the network busy for `duration` from now
    pub fn begin_request(&mut self, duration: Duration) {
        let until = Instant::now() + duration;
        self.network_busy_until = Some(self.network_busy_until.map_or(until, |u| u.max(until)));
    }

    /// Whether the network has been quiet for the idle window at `now`
    #[must_use]
    pub fn is_network_idle(&self, now: Instant) -> bool {
        self.network_busy_until
            .map_or(true, |until| now >= until + self.idle_threshold)
    }

    /// Queue an event for subscribers
    pub fn emit(&mut self, event: PageEvent) {
        self.events.push(event);
    }

    /// Apply `transition` once `delay` has elapsed
    pub fn schedule<F>(&mut self, delay: Duration, transition: F)
    where
        F: FnOnce(&mut MockPage) + Send + 'static,
    {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.scheduled.push(Scheduled {
            at: Instant::now() + delay,
            seq,
            apply: Box::new(transition),
        });
    }

    /// Apply every transition due at `now`, in schedule order
    pub fn advance(&mut self, now: Instant) {
        loop {
            let next = self
                .scheduled
                .iter()
                .enumerate()
                .filter(|(_, s)| s.at <= now)
                .min_by_key(|(_, s)| (s.at, s.seq))
                .map(|(i, _)| i);
            match next {
                Some(index) => {
                    let due = self.scheduled.swap_remove(index);
                    (due.apply)(self);
                }
                None => break,
            }
        }
    }

    fn take_events(&mut self) -> Vec<PageEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Scripted application behind a [`MockDriver`]
pub trait MockApp: Send {
    /// The page navigated to `url`
    fn on_goto(&mut self, page: &mut MockPage, url: &str);

    /// An element was clicked
    fn on_click(&mut self, _page: &mut MockPage, _key: &str) {}

    /// A key was pressed
    fn on_press(&mut self, _page: &mut MockPage, _key: &str) {}

    /// The page was reloaded
    fn on_reload(&mut self, page: &mut MockPage) {
        let url = page.url().to_string();
        self.on_goto(page, &url);
    }
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

#[derive(Debug, Clone)]
struct Fault {
    op: String,
    key: Option<String>,
    message: String,
    hang: bool,
}

struct MockState {
    page: MockPage,
    app: Option<Box<dyn MockApp>>,
    history: Vec<String>,
    faults: Vec<Fault>,
    closed: bool,
}

impl MockState {
    fn fault_for(&self, op: &str, key: Option<&str>) -> Option<Fault> {
        self.faults
            .iter()
            .find(|f| f.op == op && (f.key.is_none() || f.key.as_deref() == key))
            .cloned()
    }
}

/// Scripted in-memory driver
pub struct MockDriver {
    state: Mutex<MockState>,
    handlers: Mutex<Vec<PageEventHandler>>,
    action_timeout: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("MockDriver")
            .field("page", &state.page)
            .field("calls", &state.history.len())
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create a driver on a blank page
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                page: MockPage::default(),
                app: None,
                history: Vec::new(),
                faults: Vec::new(),
                closed: false,
            }),
            handlers: Mutex::new(Vec::new()),
            action_timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            poll_interval: Duration::from_millis(MOCK_POLL_INTERVAL_MS),
        }
    }

    /// Create a driver backed by a scripted app
    #[must_use]
    pub fn with_app(app: impl MockApp + 'static) -> Self {
        let driver = Self::new();
        lock(&driver.state).app = Some(Box::new(app));
        driver
    }

    /// Create a driver backed by the simulated login application
    #[must_use]
    pub fn login_app(config: LoginAppConfig) -> Self {
        Self::with_app(LoginApp::new(config))
    }

    /// Set how long actions wait for their target
    #[must_use]
    pub const fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Run `f` against the page, applying due transitions first
    pub fn with_page<R>(&self, f: impl FnOnce(&mut MockPage) -> R) -> R {
        let result = {
            let mut state = lock(&self.state);
            state.page.advance(Instant::now());
            f(&mut state.page)
        };
        self.flush_events();
        result
    }

    /// Add an element
    pub fn add_element(&self, key: impl Into<String>, element: MockElement) {
        self.with_page(|p| p.insert(key, element));
    }

    /// Make an element visible after `delay`
    pub fn show_element(&self, key: &str, delay: Duration) {
        self.with_page(|p| p.show(key, delay));
    }

    /// Apply `transition` after `delay`
    pub fn schedule<F>(&self, delay: Duration, transition: F)
    where
        F: FnOnce(&mut MockPage) + Send + 'static,
    {
        self.with_page(|p| p.schedule(delay, transition));
    }

    /// Keep the network busy for `duration`
    pub fn set_network_busy(&self, duration: Duration) {
        self.with_page(|p| p.begin_request(duration));
    }

    /// Emit an event to subscribers
    pub fn emit(&self, event: PageEvent) {
        self.with_page(|p| p.emit(event));
    }

    /// Emit a console error to subscribers
    pub fn emit_console_error(&self, text: impl Into<String>) {
        self.emit(PageEvent::Console(ConsoleMessage::new(
            ConsoleKind::Error,
            text,
        )));
    }

    /// Make `op` fail on every call
    pub fn fail_on(&self, op: impl Into<String>, message: impl Into<String>) {
        self.push_fault(op.into(), None, message.into(), false);
    }

    /// Make `op` fail when targeting `key`
    pub fn fail_on_locator(
        &self,
        op: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push_fault(op.into(), Some(key.into()), message.into(), false);
    }

    /// Make `op` never resolve
    pub fn hang_on(&self, op: impl Into<String>) {
        self.push_fault(op.into(), None, String::new(), true);
    }

    /// Remove all injected faults
    pub fn clear_faults(&self) {
        lock(&self.state).faults.clear();
    }

    fn push_fault(&self, op: String, key: Option<String>, message: String, hang: bool) {
        lock(&self.state).faults.push(Fault {
            op,
            key,
            message,
            hang,
        });
    }

    /// Recorded calls as `op` or `op:target`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        lock(&self.state).history.clone()
    }

    /// Whether a call starting with `prefix` was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        lock(&self.state)
            .history
            .iter()
            .any(|c| c.starts_with(prefix))
    }

    /// Number of calls starting with `prefix`
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        lock(&self.state)
            .history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Current URL without recording a call
    #[must_use]
    pub fn current_url(&self) -> String {
        self.with_page(|p| p.url().to_string())
    }

    /// Input value of an element without recording a call
    #[must_use]
    pub fn value_of(&self, key: &str) -> String {
        self.with_page(|p| p.value_of(key).to_string())
    }

    /// Whether the session was closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    fn flush_events(&self) {
        let events = lock(&self.state).page.take_events();
        if events.is_empty() {
            return;
        }
        let handlers = lock(&self.handlers).clone();
        for event in &events {
            for handler in &handlers {
                handler(event);
            }
        }
    }

    async fn enter(&self, op: &str, target: Option<&str>) -> ProbeResult<()> {
        let fault = {
            let mut state = lock(&self.state);
            state.history.push(match target {
                Some(t) => format!("{op}:{t}"),
                None => op.to_string(),
            });
            if state.closed {
                return Err(ProbeError::Session {
                    message: format!("{op} called on a closed session"),
                });
            }
            state.fault_for(op, target)
        };

        match fault {
            Some(Fault { hang: true, .. }) => std::future::pending().await,
            Some(fault) if op == "goto" => Err(ProbeError::Navigation {
                url: target.unwrap_or_default().to_string(),
                message: fault.message,
            }),
            Some(fault) => Err(ProbeError::driver(op, fault.message)),
            None => Ok(()),
        }
    }

    async fn await_visible(&self, key: &str, timeout: Duration) -> ProbeResult<()> {
        let start = Instant::now();
        loop {
            if self.with_page(|p| p.is_visible(key, Instant::now())) {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(ProbeError::Timeout {
                    ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn dispatch(&self, f: impl FnOnce(&mut dyn MockApp, &mut MockPage)) {
        {
            let mut state = lock(&self.state);
            state.page.advance(Instant::now());
            let MockState { page, app, .. } = &mut *state;
            if let Some(app) = app.as_mut() {
                f(app.as_mut(), page);
            }
        }
        self.flush_events();
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        self.enter("goto", Some(url)).await?;
        let has_app = lock(&self.state).app.is_some();
        if has_app {
            self.dispatch(|app, page| app.on_goto(page, url));
        } else {
            self.with_page(|p| p.set_url(url));
        }
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        let key = locator.key();
        self.enter("click", Some(&key)).await?;
        self.await_visible(&key, self.action_timeout).await?;
        self.dispatch(|app, page| app.on_click(page, &key));
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> ProbeResult<()> {
        let key = locator.key();
        self.enter("fill", Some(&key)).await?;
        self.await_visible(&key, self.action_timeout).await?;
        self.with_page(|p| {
            if let Some(el) = p.elements.get_mut(&key) {
                el.value = text.to_string();
            }
        });
        Ok(())
    }

    async fn text_content(&self, locator: &Locator) -> ProbeResult<Option<String>> {
        let key = locator.key();
        self.enter("text_content", Some(&key)).await?;
        let start = Instant::now();
        loop {
            if let Some(el) = self.with_page(|p| p.element(&key).cloned()) {
                return Ok(el.text);
            }
            if start.elapsed() >= self.action_timeout {
                return Err(ProbeError::Timeout {
                    ms: self.action_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
        let key = locator.key();
        self.enter("is_visible", Some(&key)).await?;
        Ok(self.with_page(|p| p.is_visible(&key, Instant::now())))
    }

    async fn wait_for_selector(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        let key = locator.key();
        self.enter("wait_for_selector", Some(&key)).await?;
        self.await_visible(&key, timeout).await
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> ProbeResult<()> {
        self.enter("wait_for_network_idle", None).await?;
        let start = Instant::now();
        loop {
            if self.with_page(|p| p.is_network_idle(Instant::now())) {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(ProbeError::Timeout {
                    ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>> {
        self.enter("screenshot", None).await?;
        let url = self.current_url();
        let mut data = PNG_MAGIC.to_vec();
        data.extend_from_slice(url.as_bytes());
        if full_page {
            data.extend_from_slice(b"#fullpage");
        }
        Ok(data)
    }

    async fn title(&self) -> ProbeResult<String> {
        self.enter("title", None).await?;
        Ok(self.with_page(|p| p.title().to_string()))
    }

    async fn url(&self) -> ProbeResult<String> {
        self.enter("url", None).await?;
        Ok(self.current_url())
    }

    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value> {
        self.enter("evaluate", Some(script)).await?;
        Ok(self.with_page(|p| {
            p.eval_results
                .get(script)
                .cloned()
                .unwrap_or(serde_json::Value::Null)
        }))
    }

    async fn press(&self, key: &str) -> ProbeResult<()> {
        self.enter("press", Some(key)).await?;
        self.dispatch(|app, page| app.on_press(page, key));
        Ok(())
    }

    async fn reload(&self) -> ProbeResult<()> {
        self.enter("reload", None).await?;
        self.dispatch(|app, page| app.on_reload(page));
        Ok(())
    }

    fn subscribe(&self, handler: PageEventHandler) {
        lock(&self.handlers).push(handler);
    }

    async fn close(&self) -> ProbeResult<()> {
        self.enter("close", None).await?;
        lock(&self.state).closed = true;
        Ok(())
    }
}

// =============================================================================
// SIMULATED LOGIN APPLICATION
// =============================================================================

/// Route of the password reset page
pub const RESET_PASSWORD_PATH: &str = "/web/index.php/auth/requestPasswordResetCode";

const SESSION_COOKIE: &str = "orangehrm";

/// Timing and credentials of the simulated application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAppConfig {
    /// Origin the app is served from
    pub base_url: String,
    /// Login route
    pub login_path: String,
    /// Only account that authenticates
    pub credentials: Credentials,
    /// Delay before a freshly rendered page becomes visible
    pub render_delay: Duration,
    /// Server round-trip time for form submissions and logout
    pub response_latency: Duration,
    /// Time for the user menu dropdown to open
    pub menu_animation: Duration,
}

impl Default for LoginAppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            credentials: Credentials::default(),
            render_delay: Duration::from_millis(100),
            response_latency: Duration::from_millis(300),
            menu_animation: Duration::from_millis(200),
        }
    }
}

impl LoginAppConfig {
    /// Simulate the environment described by a harness config
    #[must_use]
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_path: config.login_path.clone(),
            credentials: config.valid_credentials.clone(),
            ..Self::default()
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

/// Scripted login/dashboard/logout flow
#[derive(Debug, Clone)]
pub struct LoginApp {
    config: LoginAppConfig,
}

impl LoginApp {
    /// Create the app
    #[must_use]
    pub const fn new(config: LoginAppConfig) -> Self {
        Self { config }
    }

    fn render_login(page: &mut MockPage, config: &LoginAppConfig) {
        let delay = config.render_delay;
        page.clear_elements();
        page.set_url(config.url(&config.login_path));
        page.set_title("OrangeHRM");
        page.insert(login::USERNAME_INPUT, MockElement::visible_after(delay));
        page.insert(login::PASSWORD_INPUT, MockElement::visible_after(delay));
        page.insert(
            login::LOGIN_BUTTON,
            MockElement::visible_after(delay).with_text("Login"),
        );
        page.insert(
            login::PAGE_HEADING,
            MockElement::visible_after(delay).with_text("Login"),
        );
        page.insert(
            login::REMEMBER_ME_CHECKBOX,
            MockElement::visible_after(delay),
        );
        page.insert(
            login::forgot_password_locator().key(),
            MockElement::visible_after(delay).with_text("Forgot your password?"),
        );
        page.begin_request(delay);
    }

    fn render_dashboard(page: &mut MockPage, config: &LoginAppConfig) {
        let delay = config.render_delay;
        page.clear_elements();
        page.set_url(config.url(DASHBOARD_PATH));
        page.set_title("OrangeHRM");
        page.insert(home::MAIN_CONTENT, MockElement::visible_after(delay));
        page.insert(home::SIDEBAR_MENU, MockElement::visible_after(delay));
        page.insert(
            home::USER_PROFILE_MENU,
            MockElement::visible_after(delay).with_text(config.credentials.username.clone()),
        );
        page.insert(
            home::DASHBOARD_HEADING,
            MockElement::visible_after(delay).with_text("Dashboard"),
        );
        page.insert(
            home::PAGE_TITLE,
            MockElement::visible_after(delay).with_text("Dashboard"),
        );
        page.insert(
            home::LOGOUT_BUTTON,
            MockElement::hidden().with_text("Logout"),
        );
        page.begin_request(delay);
    }

    fn render_reset_password(page: &mut MockPage, config: &LoginAppConfig) {
        page.clear_elements();
        page.set_url(config.url(RESET_PASSWORD_PATH));
        page.insert(
            login::PAGE_HEADING,
            MockElement::visible_after(config.render_delay).with_text("Reset Password"),
        );
        page.begin_request(config.render_delay);
    }

    fn submit(&self, page: &mut MockPage) {
        let username = page.value_of(login::USERNAME_INPUT).to_string();
        let password = page.value_of(login::PASSWORD_INPUT).to_string();
        let latency = self.config.response_latency;
        let config = self.config.clone();

        let _ = page.remove(login::ERROR_MESSAGE);
        let _ = page.remove(login::FIELD_ERROR);

        if username.is_empty() || password.is_empty() {
            // Client-side validation: no request is sent
            page.insert(
                login::FIELD_ERROR,
                MockElement::visible_after(config.render_delay).with_text("Required"),
            );
            return;
        }

        page.begin_request(latency);
        if username == config.credentials.username && password == config.credentials.password {
            page.schedule(latency, move |p| {
                p.set_cookie(SESSION_COOKIE, "active");
                Self::render_dashboard(p, &config);
            });
        } else {
            page.schedule(latency, move |p| {
                p.insert(
                    login::ERROR_MESSAGE,
                    MockElement::visible().with_text("Invalid credentials"),
                );
            });
        }
    }

    fn logged_in(page: &MockPage) -> bool {
        page.cookie(SESSION_COOKIE).is_some()
    }
}

impl MockApp for LoginApp {
    fn on_goto(&mut self, page: &mut MockPage, url: &str) {
        let path = url
            .strip_prefix(self.config.base_url.trim_end_matches('/'))
            .unwrap_or(url);
        if path.starts_with(DASHBOARD_PATH) && Self::logged_in(page) {
            Self::render_dashboard(page, &self.config);
        } else {
            Self::render_login(page, &self.config);
        }
    }

    fn on_click(&mut self, page: &mut MockPage, key: &str) {
        if key == login::LOGIN_BUTTON {
            self.submit(page);
        } else if key == home::USER_PROFILE_MENU {
            page.show(home::LOGOUT_BUTTON, self.config.menu_animation);
        } else if key == home::LOGOUT_BUTTON {
            let config = self.config.clone();
            page.begin_request(config.response_latency);
            page.schedule(config.response_latency, move |p| {
                p.clear_cookie(SESSION_COOKIE);
                Self::render_login(p, &config);
            });
        } else if key == login::forgot_password_locator().key() {
            let config = self.config.clone();
            page.schedule(config.response_latency, move |p| {
                Self::render_reset_password(p, &config);
            });
        } else if key == login::REMEMBER_ME_CHECKBOX {
            if let Some(el) = page.elements.get_mut(key) {
                el.value = if el.value.is_empty() {
                    "on".to_string()
                } else {
                    String::new()
                };
            }
        }
    }

    fn on_press(&mut self, page: &mut MockPage, key: &str) {
        if key == "Enter" && page.element(login::LOGIN_BUTTON).is_some() {
            self.submit(page);
        }
    }
}

// =============================================================================
// SESSION FACTORY
// =============================================================================

type DriverBuilder = Box<dyn Fn(usize) -> MockDriver + Send + Sync>;

/// Opens a new [`MockDriver`] per test and keeps a handle for inspection
pub struct MockSessionFactory {
    build: DriverBuilder,
    sessions: Mutex<Vec<Arc<MockDriver>>>,
}

impl std::fmt::Debug for MockSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSessionFactory")
            .field("opened", &self.opened())
            .finish_non_exhaustive()
    }
}

impl MockSessionFactory {
    /// Build each session with `build(session_index)`
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(usize) -> MockDriver + Send + Sync + 'static,
    {
        Self {
            build: Box::new(build),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Every session runs the simulated login application
    #[must_use]
    pub fn login_app(config: LoginAppConfig) -> Self {
        Self::new(move |_| MockDriver::login_app(config.clone()))
    }

    /// Sessions opened so far, in opening order
    #[must_use]
    pub fn sessions(&self) -> Vec<Arc<MockDriver>> {
        lock(&self.sessions).clone()
    }

    /// Number of sessions opened
    #[must_use]
    pub fn opened(&self) -> usize {
        lock(&self.sessions).len()
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn open(&self) -> ProbeResult<Arc<dyn Driver>> {
        let driver = {
            let mut sessions = lock(&self.sessions);
            let driver = Arc::new((self.build)(sessions.len()));
            sessions.push(Arc::clone(&driver));
            driver
        };
        Ok(driver)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mod mock_page_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_scheduled_transitions_apply_in_order() {
            let mut page = MockPage::default();
            page.schedule(Duration::from_millis(20), |p| p.set_title("second"));
            page.schedule(Duration::from_millis(10), |p| p.set_title("first"));
            page.advance(Instant::now());
            assert_eq!(page.title(), "");

            tokio::time::advance(Duration::from_millis(15)).await;
            page.advance(Instant::now());
            assert_eq!(page.title(), "first");

            tokio::time::advance(Duration::from_millis(10)).await;
            page.advance(Instant::now());
            assert_eq!(page.title(), "second");
        }

        #[tokio::test(start_paused = true)]
        async fn test_network_idle_window() {
            let mut page = MockPage::default();
            assert!(page.is_network_idle(Instant::now()));
            page.begin_request(Duration::from_millis(100));
            assert!(!page.is_network_idle(Instant::now()));
            tokio::time::advance(Duration::from_millis(100 + NETWORK_IDLE_THRESHOLD_MS)).await;
            assert!(page.is_network_idle(Instant::now()));
        }
    }

    mod mock_driver_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_goto_without_app_records_history() {
            let driver = MockDriver::new();
            driver.goto("https://example.com").await.unwrap();
            assert_eq!(driver.url().await.unwrap(), "https://example.com");
            assert!(driver.was_called("goto:https://example.com"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_click_waits_for_actionability() {
            let driver = MockDriver::new();
            driver.add_element("#late", MockElement::visible_after(Duration::from_millis(300)));
            let start = Instant::now();
            driver.click(&Locator::css("#late")).await.unwrap();
            assert!(start.elapsed() >= Duration::from_millis(300));
        }

        #[tokio::test(start_paused = true)]
        async fn test_click_on_missing_element_times_out() {
            let driver = MockDriver::new().with_action_timeout(Duration::from_millis(100));
            let err = driver.click(&Locator::css("#nope")).await.unwrap_err();
            assert!(matches!(err, ProbeError::Timeout { ms: 100 }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_fault_injection() {
            let driver = MockDriver::new();
            driver.fail_on("goto", "net::ERR_NAME_NOT_RESOLVED");
            driver.fail_on_locator("is_visible", "#flaky", "detached");

            let err = driver.goto("https://down.test").await.unwrap_err();
            assert!(matches!(
                err,
                ProbeError::Navigation { ref url, .. } if url == "https://down.test"
            ));

            let err = driver.is_visible(&Locator::css("#flaky")).await.unwrap_err();
            assert!(matches!(err, ProbeError::Driver { .. }));
            assert!(!driver.is_visible(&Locator::css("#other")).await.unwrap());

            driver.clear_faults();
            driver.goto("https://up.test").await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_hang_never_resolves() {
            let driver = MockDriver::new();
            driver.hang_on("title");
            let result = tokio::time::timeout(Duration::from_secs(60), driver.title()).await;
            assert!(result.is_err());
        }

        #[tokio::test(start_paused = true)]
        async fn test_closed_session_rejects_calls() {
            let driver = MockDriver::new();
            driver.close().await.unwrap();
            assert!(driver.is_closed());
            let err = driver.title().await.unwrap_err();
            assert!(matches!(err, ProbeError::Session { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_subscribers_receive_events() {
            let driver = MockDriver::new();
            let seen = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&seen);
            driver.subscribe(Arc::new(move |event: &PageEvent| {
                if matches!(event, PageEvent::Console(_) | PageEvent::Navigated(_)) {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }));
            driver.emit_console_error("boom");
            driver.goto("https://example.com").await.unwrap();
            assert_eq!(seen.load(Ordering::SeqCst), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_screenshot_is_png() {
            let driver = MockDriver::new();
            let bytes = driver.screenshot(true).await.unwrap();
            assert_eq!(&bytes[..8], &PNG_MAGIC);
            assert!(bytes.ends_with(b"#fullpage"));
        }
    }

    mod login_app_tests {
        use super::*;

        async fn on_login_page() -> MockDriver {
            let config = LoginAppConfig::default();
            let driver = MockDriver::login_app(config.clone());
            driver.goto(&config.url(&config.login_path)).await.unwrap();
            driver
                .wait_for_selector(&Locator::css(login::USERNAME_INPUT), Duration::from_secs(1))
                .await
                .unwrap();
            driver
        }

        #[tokio::test(start_paused = true)]
        async fn test_valid_credentials_reach_dashboard() {
            let driver = on_login_page().await;
            driver.fill(&Locator::css(login::USERNAME_INPUT), "Admin").await.unwrap();
            driver.fill(&Locator::css(login::PASSWORD_INPUT), "admin123").await.unwrap();
            driver.click(&Locator::css(login::LOGIN_BUTTON)).await.unwrap();
            driver
                .wait_for_selector(&Locator::css(home::MAIN_CONTENT), Duration::from_secs(2))
                .await
                .unwrap();
            assert!(driver.current_url().ends_with(DASHBOARD_PATH));
        }

        #[tokio::test(start_paused = true)]
        async fn test_padded_username_is_rejected() {
            let driver = on_login_page().await;
            driver.fill(&Locator::css(login::USERNAME_INPUT), " Admin ").await.unwrap();
            driver.fill(&Locator::css(login::PASSWORD_INPUT), "admin123").await.unwrap();
            driver.press("Enter").await.unwrap();
            driver
                .wait_for_selector(&Locator::css(login::ERROR_MESSAGE), Duration::from_secs(2))
                .await
                .unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_empty_password_shows_field_error() {
            let driver = on_login_page().await;
            driver.fill(&Locator::css(login::USERNAME_INPUT), "Admin").await.unwrap();
            driver.click(&Locator::css(login::LOGIN_BUTTON)).await.unwrap();
            driver
                .wait_for_selector(&Locator::css(login::FIELD_ERROR), Duration::from_secs(2))
                .await
                .unwrap();
            assert!(!driver.is_visible(&Locator::css(login::ERROR_MESSAGE)).await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_sessions_from_factory_are_independent() {
            let factory = MockSessionFactory::login_app(LoginAppConfig::default());
            let a = factory.open().await.unwrap();
            let b = factory.open().await.unwrap();
            a.goto("https://opensource-demo.orangehrmlive.com/web/index.php/auth/login")
                .await
                .unwrap();
            assert_eq!(factory.opened(), 2);
            assert_eq!(b.url().await.unwrap(), "about:blank");
        }
    }
}
