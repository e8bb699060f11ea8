//! Driver - Abstract Browser Automation Trait
//!
//! The harness never talks to a browser directly. Everything it needs from
//! the automation engine is expressed by [`Driver`]; page objects, waits and
//! lifecycle hooks are written against `Arc<dyn Driver>`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Driver (trait)                                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────┐          ┌────────────────────────┐  │
//! │  │  ChromiumDriver    │          │  MockDriver            │  │
//! │  │  (feature browser) │          │  (tests, --simulate)   │  │
//! │  │  CDP via           │          │  scripted in-memory    │  │
//! │  │  chromiumoxide     │          │  page + login app      │  │
//! │  └────────────────────┘          └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All methods take `&self`: one session is shared by every page object
//! bound to it, so implementations use interior mutability.

use crate::locator::Locator;
use crate::result::ProbeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Severity of a browser console message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleKind {
    /// `console.log`
    Log,
    /// `console.debug`
    Debug,
    /// `console.info`
    Info,
    /// `console.warn`
    Warning,
    /// `console.error`
    Error,
}

impl ConsoleKind {
    /// Name as reported by browsers
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A message written to the page console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// Message severity
    pub kind: ConsoleKind,
    /// Message text
    pub text: String,
}

impl ConsoleMessage {
    /// Create a console message
    #[must_use]
    pub fn new(kind: ConsoleKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Page-level events a driver can report to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageEvent {
    /// Console output
    Console(ConsoleMessage),
    /// Uncaught exception in page scripts
    PageError(String),
    /// Main frame navigated to a URL
    Navigated(String),
}

/// Subscriber callback for [`PageEvent`]s
pub type PageEventHandler = Arc<dyn Fn(&PageEvent) + Send + Sync>;

/// Abstract driver trait for browser automation
///
/// # Implementations
///
/// - `MockDriver` - scripted page for unit and scenario tests
/// - `ChromiumDriver` - CDP via chromiumoxide (feature `browser`)
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate to URL
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Click element
    async fn click(&self, locator: &Locator) -> ProbeResult<()>;

    /// Replace the value of an input element
    async fn fill(&self, locator: &Locator, text: &str) -> ProbeResult<()>;

    /// Text content of an element (`None` when it has none)
    async fn text_content(&self, locator: &Locator) -> ProbeResult<Option<String>>;

    /// Whether the element is attached and visible right now
    async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool>;

    /// Wait for the element to become visible
    async fn wait_for_selector(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()>;

    /// Wait until no network requests have been in flight for the idle window
    async fn wait_for_network_idle(&self, timeout: Duration) -> ProbeResult<()>;

    /// Capture the page as PNG bytes
    async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>>;

    /// Document title
    async fn title(&self) -> ProbeResult<String>;

    /// Current URL
    async fn url(&self) -> ProbeResult<String>;

    /// Evaluate a JavaScript expression in the page
    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value>;

    /// Press a keyboard key on the focused element
    async fn press(&self, key: &str) -> ProbeResult<()>;

    /// Reload the current page
    async fn reload(&self) -> ProbeResult<()>;

    /// Register a passive observer for page events
    fn subscribe(&self, handler: PageEventHandler);

    /// Close the session
    async fn close(&self) -> ProbeResult<()>;
}

/// Opens one fresh driver session per test
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a new, unshared session
    async fn open(&self) -> ProbeResult<Arc<dyn Driver>>;
}

/// JavaScript truthiness of an evaluation result
#[must_use]
pub fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1.5)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn test_console_kind_names() {
        assert_eq!(ConsoleKind::Error.as_str(), "error");
        assert_eq!(ConsoleKind::Warning.as_str(), "warning");
        let msg = ConsoleMessage::new(ConsoleKind::Error, "boom");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"kind": "error", "text": "boom"})
        );
    }
}
