//! Locator abstraction for element selection.
//!
//! A [`Locator`] names exactly one UI element. Drivers resolve CSS selectors
//! natively; the other selector kinds are resolved through [`Selector::to_query`].

use serde::{Deserialize, Serialize};

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Text content selector
    Text(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// CSS selector narrowed by text content
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Convert to a JavaScript expression yielding the element or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Css(s) => format!("document.querySelector({s:?})"),
            Self::XPath(s) => {
                format!("document.evaluate({s:?}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue")
            }
            Self::Text(t) => {
                format!("Array.from(document.querySelectorAll('*')).find(el => el.children.length === 0 && el.textContent.includes({t:?}))")
            }
            Self::TestId(id) => format!("document.querySelector('[data-testid={id:?}]')"),
            Self::CssWithText { css, text } => {
                format!("Array.from(document.querySelectorAll({css:?})).find(el => el.textContent.includes({text:?}))")
            }
        }
    }

    /// The CSS form of this selector, when one exists
    #[must_use]
    pub fn as_css(&self) -> Option<String> {
        match self {
            Self::Css(s) => Some(s.clone()),
            Self::TestId(id) => Some(format!("[data-testid={id:?}]")),
            Self::XPath(_) | Self::Text(_) | Self::CssWithText { .. } => None,
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(s) => f.write_str(s),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::Text(t) => write!(f, "text={t}"),
            Self::TestId(id) => write!(f, "data-testid={id}"),
            Self::CssWithText { css, text } => write!(f, "{css}:has-text({text:?})"),
        }
    }
}

/// A named handle on one UI element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    selector: Selector,
    name: Option<String>,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub const fn new(selector: Selector) -> Self {
        Self {
            selector,
            name: None,
        }
    }

    /// Create a CSS locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Selector::css(selector))
    }

    /// Create a locator for an element with the given text, scoped by CSS
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Selector::CssWithText {
            css: css.into(),
            text: text.into(),
        })
    }

    /// Attach a human-readable name used in logs
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Underlying selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Human-readable name, if set
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Selector string used as the element key by drivers
    #[must_use]
    pub fn key(&self) -> String {
        self.selector.to_string()
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.selector)
    }
}

impl From<&str> for Locator {
    fn from(css: &str) -> Self {
        Self::css(css)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_display_is_raw_selector() {
        let loc = Locator::css("input[name=\"username\"]").named("username field");
        assert_eq!(loc.to_string(), "input[name=\"username\"]");
        assert_eq!(loc.key(), "input[name=\"username\"]");
        assert_eq!(loc.name(), Some("username field"));
    }

    #[test]
    fn test_css_with_text_display() {
        let loc = Locator::css_with_text("a", "Forgot your password?");
        assert_eq!(loc.to_string(), "a:has-text(\"Forgot your password?\")");
        assert!(loc.selector().as_css().is_none());
    }

    #[test]
    fn test_queries() {
        assert_eq!(
            Selector::css("#go").to_query(),
            "document.querySelector(\"#go\")"
        );
        assert!(Selector::test_id("submit").to_query().contains("data-testid"));
        assert!(Selector::text("Dashboard").to_query().contains("textContent"));
        assert_eq!(
            Selector::test_id("submit").as_css(),
            Some("[data-testid=\"submit\"]".to_string())
        );
    }

    #[test]
    fn test_from_str() {
        let loc: Locator = ".oxd-alert-content".into();
        assert_eq!(loc.selector(), &Selector::Css(".oxd-alert-content".into()));
    }
}
